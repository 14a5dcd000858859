//! Control channel subsystem.
//!
//! # Data Flow
//! ```text
//! Operator shell ─┐
//!                 ├─→ ControlHandle ─→ mpsc ─→ ControlLoop ─→ Balancer snapshot swap
//! Config reload ──┘   (event.rs)              (event_loop.rs)
//!   (reconcile.rs)
//! ```
//!
//! # Design Decisions
//! - One serialized event stream; the control loop is the only writer
//! - `strategy/edit` carries a reply channel so rejections reach the operator
//! - Exit stops the loop only; listener and sessions are left alone

pub mod event;
pub mod event_loop;
pub mod reconcile;

pub use event::{ControlError, ControlHandle, Event, CONTROL_CHANNEL_CAPACITY};
pub use event_loop::ControlLoop;
