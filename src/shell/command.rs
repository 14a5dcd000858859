//! Operator command parsing.

use thiserror::Error;

use crate::load_balancer::StrategyKind;

/// Every command name the shell understands.
pub const COMMANDS: [&str; 7] = [
    "strategy/change",
    "strategy/edit",
    "backend/add",
    "backend/list",
    "topology/list",
    "topology/test",
    "exit",
];

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StrategyChange(StrategyKind),
    StrategyEdit(usize),
    BackendAdd { host: String, port: u16 },
    BackendList,
    TopologyList,
    TopologyTest(String),
    Exit,
}

/// A command line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command {0:?}")]
    Unknown(String),

    #[error("{command}: missing <{argument}>")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("{command}: invalid <{argument}> {value:?}")]
    InvalidArgument {
        command: &'static str,
        argument: &'static str,
        value: String,
    },
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };

        let command = match name {
            "strategy/change" => {
                let strategy = required(&mut words, "strategy/change", "name")?;
                Command::StrategyChange(StrategyKind::from_name(strategy))
            }
            "strategy/edit" => {
                let index = required(&mut words, "strategy/edit", "index")?;
                Command::StrategyEdit(number(index, "strategy/edit", "index")?)
            }
            "backend/add" => {
                let host = required(&mut words, "backend/add", "host")?.to_string();
                let port = required(&mut words, "backend/add", "port")?;
                let port: u16 = number(port, "backend/add", "port")?;
                if port == 0 {
                    return Err(CommandError::InvalidArgument {
                        command: "backend/add",
                        argument: "port",
                        value: "0".into(),
                    });
                }
                Command::BackendAdd { host, port }
            }
            "backend/list" => Command::BackendList,
            "topology/list" => Command::TopologyList,
            "topology/test" => {
                let id = required(&mut words, "topology/test", "request-id")?;
                Command::TopologyTest(id.to_string())
            }
            "exit" => Command::Exit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn required<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    words
        .next()
        .ok_or(CommandError::MissingArgument { command, argument })
}

fn number<T: std::str::FromStr>(
    value: &str,
    command: &'static str,
    argument: &'static str,
) -> Result<T, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidArgument {
        command,
        argument,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_every_command() {
        assert_eq!(
            Command::parse("strategy/change round-robin"),
            Ok(Some(Command::StrategyChange(StrategyKind::RoundRobin)))
        );
        assert_eq!(Command::parse("strategy/edit 2"), Ok(Some(Command::StrategyEdit(2))));
        assert_eq!(
            Command::parse("  backend/add localhost 8085 "),
            Ok(Some(Command::BackendAdd {
                host: "localhost".into(),
                port: 8085
            }))
        );
        assert_eq!(Command::parse("backend/list"), Ok(Some(Command::BackendList)));
        assert_eq!(Command::parse("topology/list"), Ok(Some(Command::TopologyList)));
        assert_eq!(
            Command::parse("topology/test abc123"),
            Ok(Some(Command::TopologyTest("abc123".into())))
        );
        assert_eq!(Command::parse("exit"), Ok(Some(Command::Exit)));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_unknown_strategy_name_means_hash() {
        assert_eq!(
            Command::parse("strategy/change random"),
            Ok(Some(Command::StrategyChange(StrategyKind::Hash)))
        );
    }

    #[test]
    fn test_malformed_commands() {
        assert_eq!(
            Command::parse("backend/add localhost"),
            Err(CommandError::MissingArgument {
                command: "backend/add",
                argument: "port"
            })
        );
        assert!(matches!(
            Command::parse("backend/add localhost 70000"),
            Err(CommandError::InvalidArgument { argument: "port", .. })
        ));
        assert!(matches!(
            Command::parse("backend/add localhost 0"),
            Err(CommandError::InvalidArgument { argument: "port", .. })
        ));
        assert!(matches!(
            Command::parse("strategy/edit -1"),
            Err(CommandError::InvalidArgument { argument: "index", .. })
        ));
        assert_eq!(
            Command::parse("reload"),
            Err(CommandError::Unknown("reload".into()))
        );
    }
}
