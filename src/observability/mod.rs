//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (request_id, backend, peer_addr)
//!
//! Consumers:
//!     → logging.rs subscriber → log file (default lb.log) or stderr
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted strings
//! - Request ID flows from dispatch into relay logs

pub mod logging;

pub use logging::{init_logging, LoggingError};
