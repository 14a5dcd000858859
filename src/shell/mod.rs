//! Interactive operator shell.
//!
//! Reads one command per line and either queues a control event or answers
//! a read-only introspection query. Parse errors and rejected edits are
//! printed and the shell keeps reading.

pub mod command;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::control::{ControlError, ControlHandle};
use crate::load_balancer::Balancer;
use crate::net::connection::ConnectionTracker;

pub use command::{Command, CommandError, COMMANDS};

const PROMPT: &str = ">>> ";

/// Why [`Shell::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    /// The operator typed `exit`.
    Exit,
    /// Input closed, e.g. stdin redirected from `/dev/null`.
    EndOfInput,
}

/// Operator front-end over any line-oriented reader and writer.
#[derive(Debug, Clone)]
pub struct Shell {
    balancer: Balancer,
    control: ControlHandle,
    tracker: ConnectionTracker,
    prompt: bool,
}

impl Shell {
    pub fn new(balancer: Balancer, control: ControlHandle, tracker: ConnectionTracker) -> Self {
        Self {
            balancer,
            control,
            tracker,
            prompt: true,
        }
    }

    /// Disable the `>>> ` prompt, e.g. for piped input.
    pub fn without_prompt(mut self) -> Self {
        self.prompt = false;
        self
    }

    /// Run until `exit` or end of input.
    pub async fn run<R, W>(&self, input: R, output: &mut W) -> std::io::Result<ShellExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            if self.prompt {
                output.write_all(PROMPT.as_bytes()).await?;
                output.flush().await?;
            }

            let Some(line) = lines.next_line().await? else {
                return Ok(ShellExit::EndOfInput);
            };

            let reply = match Command::parse(&line) {
                Ok(None) => continue,
                Ok(Some(Command::Exit)) => {
                    if let Err(e) = self.control.exit().await {
                        tracing::debug!(error = %e, "Exit sent to stopped control loop");
                    }
                    return Ok(ShellExit::Exit);
                }
                Ok(Some(command)) => self.execute(command).await,
                Err(CommandError::Unknown(_)) => {
                    format!("available commands: {}\n", COMMANDS.join(", "))
                }
                Err(e) => format!("{e}\n"),
            };

            output.write_all(reply.as_bytes()).await?;
            output.flush().await?;
        }
    }

    /// Execute one command and render the reply.
    async fn execute(&self, command: Command) -> String {
        match command {
            Command::StrategyChange(kind) => submitted(self.control.change_strategy(kind).await),
            Command::BackendAdd { host, port } => {
                submitted(self.control.add_backend(host, port).await)
            }
            Command::StrategyEdit(index) => match self.control.edit_strategy(index).await {
                Ok(()) => String::new(),
                Err(e) => format!("{e}\n"),
            },
            Command::TopologyList => self.balancer.describe_topology(),
            Command::TopologyTest(id) => match self.balancer.route_for(&id) {
                Some(backend) => format!("request: {id} goes to backend: {backend}\n"),
                None => format!("request: {id} has no backend: none registered\n"),
            },
            Command::BackendList => {
                let mut out = String::new();
                for (index, backend) in self.balancer.backends().iter().enumerate() {
                    out.push_str(&format!(
                        "      [{}] {} requests={} healthy={}\n",
                        index,
                        backend,
                        backend.request_count(),
                        backend.is_healthy()
                    ));
                }
                out.push_str(&format!(
                    "      strategy={} active_sessions={}\n",
                    self.balancer.strategy_kind(),
                    self.tracker.active_count()
                ));
                out
            }
            Command::Exit => String::new(),
        }
    }
}

fn submitted(result: Result<(), ControlError>) -> String {
    match result {
        Ok(()) => String::new(),
        Err(e) => format!("{e}\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlLoop;
    use crate::load_balancer::{backend::Backend, BackendRegistry, StrategyKind};
    use std::sync::Arc;

    fn setup() -> (Shell, Balancer) {
        let registry: BackendRegistry = (8081..=8084)
            .map(|p| Arc::new(Backend::new("localhost", p)))
            .collect::<Vec<_>>()
            .into();
        let balancer = Balancer::new(registry, StrategyKind::Hash, 19);
        let (control, events) = ControlHandle::channel(8);
        tokio::spawn(ControlLoop::new(balancer.clone(), events).run());
        let shell = Shell::new(balancer.clone(), control, ConnectionTracker::new()).without_prompt();
        (shell, balancer)
    }

    async fn session(shell: &Shell, script: &str) -> String {
        let mut output = Vec::new();
        shell.run(script.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_reports_why_it_stopped() {
        let (shell, _) = setup();
        let mut output = Vec::new();

        let stopped = shell.run(&b"backend/list\n"[..], &mut output).await.unwrap();
        assert_eq!(stopped, ShellExit::EndOfInput);

        let stopped = shell.run(&b"exit\nbackend/list\n"[..], &mut output).await.unwrap();
        assert_eq!(stopped, ShellExit::Exit);
    }

    #[tokio::test]
    async fn test_topology_test_uses_ring() {
        let (shell, _) = setup();
        let out = session(&shell, "topology/test abc123\n").await;
        assert_eq!(out, "request: abc123 goes to backend: localhost:8082\n");
    }

    #[tokio::test]
    async fn test_edit_rejected_then_accepted() {
        let (shell, balancer) = setup();
        let out = session(
            &shell,
            "strategy/edit 1\nstrategy/change static\nstrategy/edit 3\ntopology/test x\nexit\n",
        )
        .await;

        assert_eq!(
            out,
            "this balancing strategy (hash) does not support edits\n\
             request: x goes to backend: localhost:8084\n"
        );
        assert_eq!(balancer.strategy_kind(), StrategyKind::Static);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_input_is_reported() {
        let (shell, _) = setup();
        let out = session(&shell, "backend/add onlyhost\nfrobnicate\n\n").await;
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "backend/add: missing <port>");
        assert!(lines[1].starts_with("available commands: strategy/change"));
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_backend_add_then_list() {
        let (shell, balancer) = setup();
        // strategy/edit waits for the control loop, so the add is applied first.
        let out = session(
            &shell,
            "backend/add 10.0.0.9 7000\nstrategy/change static\nstrategy/edit 4\nbackend/list\n",
        )
        .await;

        assert_eq!(balancer.backends().len(), 5);
        assert!(out.contains("      [4] 10.0.0.9:7000 requests=0 healthy=true\n"));
        assert!(out.ends_with("      strategy=static active_sessions=0\n"));
    }

    #[tokio::test]
    async fn test_prompt_is_written() {
        let (shell, _) = setup();
        let shell = Shell { prompt: true, ..shell };
        let out = session(&shell, "exit\n").await;
        assert_eq!(out, ">>> ");
    }
}
