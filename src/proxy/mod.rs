//! Proxy subsystem.
//!
//! # Data Flow
//! ```text
//! server.rs: listener.accept()
//!     → spawn dispatch task
//!         → dispatcher.rs: request id → strategy → dial backend
//!             ├─ dial failed → "backend not available" → close client
//!             └─ dialed → request counter +1
//!                 → relay.rs: client→backend and backend→client tasks
//! ```
//!
//! # Design Decisions
//! - Protocol-agnostic: bytes are copied verbatim
//! - The two relay directions are independent; neither waits for the other
//! - No relay timeouts and no cancellation; sessions end on EOF or error

pub mod dispatcher;
pub mod relay;
pub mod server;

pub use dispatcher::{DispatchError, Dispatcher, Session, BACKEND_UNAVAILABLE};
pub use server::ProxyServer;
