//! TCP connection load balancer library.

pub mod config;
pub mod control;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod shell;

pub use config::BalancerConfig;
pub use control::ControlHandle;
pub use load_balancer::{Balancer, StrategyKind};
pub use proxy::ProxyServer;
