//! Control events and the sending side of the control channel.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::BackendConfig;
use crate::load_balancer::{StrategyError, StrategyKind};

/// Default capacity of the control channel.
pub const CONTROL_CHANNEL_CAPACITY: usize = 64;

/// A configuration change, consumed exactly once by the control loop.
#[derive(Debug)]
pub enum Event {
    /// `strategy/change`: replace the active strategy.
    StrategyChange(StrategyKind),
    /// `strategy/edit`: set the pinned index of the static strategy.
    StrategyEdit {
        index: usize,
        reply: Option<oneshot::Sender<Result<(), StrategyError>>>,
    },
    /// `backend/add`: register a new backend.
    BackendAdd(BackendConfig),
    /// `exit`: stop the control loop.
    Exit,
}

impl Event {
    /// Command name as typed in the shell.
    pub fn name(&self) -> &'static str {
        match self {
            Event::StrategyChange(_) => "strategy/change",
            Event::StrategyEdit { .. } => "strategy/edit",
            Event::BackendAdd(_) => "backend/add",
            Event::Exit => "exit",
        }
    }
}

/// Errors from submitting control events.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The control loop has stopped.
    #[error("control loop is not running")]
    Closed,

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

/// Sending side of the control channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<Event>,
}

impl ControlHandle {
    /// Create a control channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue an event.
    pub async fn send(&self, event: Event) -> Result<(), ControlError> {
        self.tx.send(event).await.map_err(|_| ControlError::Closed)
    }

    pub async fn change_strategy(&self, kind: StrategyKind) -> Result<(), ControlError> {
        self.send(Event::StrategyChange(kind)).await
    }

    pub async fn add_backend(&self, host: impl Into<String>, port: u16) -> Result<(), ControlError> {
        self.send(Event::BackendAdd(BackendConfig::new(host, port))).await
    }

    /// Set the static index and wait for the control loop's verdict.
    pub async fn edit_strategy(&self, index: usize) -> Result<(), ControlError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Event::StrategyEdit {
            index,
            reply: Some(reply_tx),
        })
        .await?;
        reply_rx.await.map_err(|_| ControlError::Closed)??;
        Ok(())
    }

    pub async fn exit(&self) -> Result<(), ControlError> {
        self.send(Event::Exit).await
    }

    /// Whether the control loop has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
