//! TCP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  TCP BALANCER                     │
//!                        │                                                   │
//!   Client connection    │  ┌──────────┐   ┌────────────┐   ┌────────────┐  │
//!   ─────────────────────┼─▶│   net    │──▶│   proxy    │──▶│ load_      │  │
//!                        │  │ listener │   │ dispatcher │   │ balancer   │  │
//!                        │  └──────────┘   └─────┬──────┘   │ (snapshot) │  │
//!                        │                       │          └─────▲──────┘  │
//!                        │                       ▼                │         │
//!   ◀────────────────────┼────────────── relay tasks ─────────────┼─────────┼──▶ Backend
//!                        │                                        │         │
//!                        │  ┌──────────┐   ┌────────────┐         │         │
//!   Operator stdin ──────┼─▶│  shell   │──▶│  control   │─────────┘         │
//!                        │  └──────────┘   │   loop     │◀── config watcher │
//!                        │                 └────────────┘                   │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::io::BufReader;

use tcp_balancer::config::watcher::ConfigWatcher;
use tcp_balancer::config::{self, BackendConfig, BalancerConfig};
use tcp_balancer::control::reconcile::forward_config_updates;
use tcp_balancer::net::listener::Listener;
use tcp_balancer::observability::init_logging;
use tcp_balancer::shell::{Shell, ShellExit};
use tcp_balancer::{ProxyServer, StrategyKind};

#[derive(Parser, Debug)]
#[command(name = "tcp-balancer")]
#[command(about = "TCP connection load balancer with pluggable strategies", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the initial strategy (round-robin, static, hash)
    #[arg(short, long)]
    strategy: Option<String>,

    /// Backend to register instead of the configured ones (host:port, repeatable)
    #[arg(long = "backend", value_parser = parse_backend)]
    backends: Vec<BackendConfig>,

    /// Override logging.file
    #[arg(long)]
    log_file: Option<String>,

    /// Log to stderr instead of a file
    #[arg(long, conflicts_with = "log_file")]
    log_stderr: bool,

    /// Reload the config file on change
    #[arg(long, requires = "config")]
    watch: bool,

    /// Serve without the interactive shell
    #[arg(long)]
    no_shell: bool,
}

fn parse_backend(value: &str) -> Result<BackendConfig, String> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected host:port, got {value:?}"))?;
    let port: u16 = port.parse().map_err(|e| format!("invalid port {port:?}: {e}"))?;
    Ok(BackendConfig::new(host, port))
}

fn build_config(args: &Args) -> Result<BalancerConfig, config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => BalancerConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(strategy) = &args.strategy {
        config.strategy.name = StrategyKind::from_name(strategy);
    }
    if !args.backends.is_empty() {
        config.backends = args.backends.clone();
    }
    if args.log_stderr {
        config.logging.file = None;
    } else if let Some(file) = &args.log_file {
        config.logging.file = Some(file.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = build_config(&args)?;

    init_logging(&config.logging)?;
    tracing::info!("tcp-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        strategy = %config.strategy.name,
        backends = config.backends.len(),
        "Configuration loaded"
    );

    // Bind failure is the one fatal error.
    let listener = Listener::bind(&config.listener).await?;
    let local_addr = listener.local_addr()?;
    let shutdown = listener.shutdown_handle();

    let server = ProxyServer::new(&config);
    let balancer = server.balancer();
    let control = server.control();
    let tracker = server.tracker();

    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            let watcher = watcher.run()?;
            tokio::spawn(forward_config_updates(
                config.clone(),
                updates,
                balancer.clone(),
                control.clone(),
            ));
            Some(watcher)
        }
        _ => None,
    };

    if args.no_shell {
        server.run(listener).await?;
        return Ok(());
    }

    let serving = tokio::spawn(server.run(listener));
    println!("LB listening on {} ...", local_addr);

    let shell = Shell::new(balancer, control, tracker);
    let mut stdout = tokio::io::stdout();
    match shell.run(BufReader::new(tokio::io::stdin()), &mut stdout).await? {
        ShellExit::Exit => shutdown.close(),
        ShellExit::EndOfInput => {
            tracing::info!("Operator input closed, serving until terminated");
        }
    }

    serving.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
