//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (session tracking, permit held until relays end)
//!     → Hand off to the dispatcher
//! ```
//!
//! # Design Decisions
//! - Bounded fan-out prevents unbounded task growth under load
//! - Accept errors are per-connection, never fatal
//! - The permit travels with the session, not with the accept loop
//! - Closing the listener stops new sessions only

pub mod connection;
pub mod listener;
