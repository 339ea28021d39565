//! Hand-off of work onto the orchestration task
//!
//! Producers (HTTP handlers, resolver tasks, the skip trigger) never touch
//! playback directly; they submit a command and return. The orchestration
//! task is the only consumer.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Work the orchestration task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorCommand {
    /// Drain the queue if idle
    Resume,
    /// Wait, then drain the queue if idle
    ResumeAfter(Duration),
    /// Stop the orchestration task
    Shutdown,
}

/// Cloneable submit handle
#[derive(Debug, Clone)]
pub struct CrossThreadScheduler {
    tx: mpsc::UnboundedSender<OrchestratorCommand>,
}

impl CrossThreadScheduler {
    /// Create a scheduler and the receiver the orchestration task consumes
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OrchestratorCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Submit a command without waiting for it to run
    ///
    /// Callable from any thread, inside or outside the runtime. Commands from
    /// one producer run in submission order. Submitting after the
    /// orchestration task has stopped is a no-op.
    pub fn submit(&self, command: OrchestratorCommand) {
        if self.tx.send(command).is_err() {
            debug!("Orchestration task stopped, dropping {:?}", command);
        }
    }
}
