//! Playback serializer
//!
//! Runs on the orchestration task and is the only writer of the Idle/Playing
//! state. Items are played strictly one at a time:
//!
//! ```text
//! Idle ──pop──▶ Playing ──acquire──▶ watch ──release──▶ Idle
//!                  │                                     ▲
//!                  └──────── acquisition failure ────────┘
//! ```
//!
//! After a `Cancelled` verdict the next item waits for the grace delay so the
//! previous browser has time to go away.

use crate::playback::cancel::CancellationSignal;
use crate::playback::display::NowPlayingSink;
use crate::playback::monitor::PlaybackMonitor;
use crate::playback::queue::{ClipQueue, QueueItem};
use crate::playback::render::{RenderBackend, RenderGuard};
use crate::playback::scheduler::OrchestratorCommand;
use crate::state::SharedState;
use crate::upstream::ChannelDirectory;
use clipq_common::events::ClipEvent;
use clipq_common::{PlaybackState, Verdict};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Category shown when the directory has none
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Collaborators of the serializer
pub struct SerializerParts {
    pub queue: Arc<ClipQueue>,
    pub cancel: Arc<CancellationSignal>,
    pub state: Arc<SharedState>,
    pub backend: Arc<dyn RenderBackend>,
    pub monitor: PlaybackMonitor,
    pub display: Arc<dyn NowPlayingSink>,
    pub directory: Arc<dyn ChannelDirectory>,
    pub grace_delay: Duration,
}

/// One-at-a-time playback of queued clips
pub struct PlaybackSerializer {
    queue: Arc<ClipQueue>,
    cancel: Arc<CancellationSignal>,
    state: Arc<SharedState>,
    backend: Arc<dyn RenderBackend>,
    monitor: PlaybackMonitor,
    display: Arc<dyn NowPlayingSink>,
    directory: Arc<dyn ChannelDirectory>,
    grace_delay: Duration,
    /// Held for the whole acquire → watch → release sequence
    gate: Mutex<()>,
    stopping: AtomicBool,
}

impl PlaybackSerializer {
    pub fn new(parts: SerializerParts) -> Self {
        Self {
            queue: parts.queue,
            cancel: parts.cancel,
            state: parts.state,
            backend: parts.backend,
            monitor: parts.monitor,
            display: parts.display,
            directory: parts.directory,
            grace_delay: parts.grace_delay,
            gate: Mutex::new(()),
            stopping: AtomicBool::new(false),
        }
    }

    /// Stop after the current item; queued items stay queued
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::Release);
    }

    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Orchestration task body
    ///
    /// Returns on `Shutdown` or once every scheduler handle is dropped.
    pub async fn run(self: Arc<Self>, mut commands: mpsc::UnboundedReceiver<OrchestratorCommand>) {
        info!("Orchestration task started");

        while let Some(command) = commands.recv().await {
            match command {
                OrchestratorCommand::Resume => self.drain().await,
                OrchestratorCommand::ResumeAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    self.drain().await;
                }
                OrchestratorCommand::Shutdown => {
                    self.request_stop();
                    break;
                }
            }

            if self.is_stopping() {
                break;
            }
        }

        info!("Orchestration task stopped");
    }

    /// Play queued items until the queue is empty
    pub async fn drain(self: &Arc<Self>) {
        loop {
            if self.is_stopping() {
                return;
            }

            let gate = self.gate.lock().await;
            let Some(item) = self.queue.pop_front() else {
                return;
            };

            let item_id = item.id;
            let this = Arc::clone(self);
            let verdict = match tokio::spawn(async move { this.play_item(item).await }).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    // Panicked outside the watch; no session was held
                    error!("Playback of {} aborted: {}", item_id, e);
                    self.state.broadcast_event(ClipEvent::ClipFailed {
                        item_id,
                        reason: e.to_string(),
                        timestamp: clipq_common::time::now(),
                    });
                    self.enter_idle().await;
                    None
                }
            };
            drop(gate);

            if verdict == Some(Verdict::Cancelled) {
                debug!("Waiting {:?} before the next clip", self.grace_delay);
                tokio::time::sleep(self.grace_delay).await;
            }
        }
    }

    /// Play one item; None when the render session could not be acquired
    async fn play_item(&self, item: QueueItem) -> Option<Verdict> {
        let category = self
            .directory
            .category_for(&item.source_label)
            .await
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());

        // A skip raised while idle belongs to no clip
        if self.cancel.take() {
            debug!("Discarding skip request raised while idle");
        }

        // Shutdown raises the skip flag too; the clear above must not swallow it
        if self.is_stopping() {
            info!("Shutting down, not starting {}", item.url);
            return None;
        }

        self.state.set_playback_state(PlaybackState::Playing).await;
        self.display.on_now_playing(&item, &category).await;
        info!("Playing {} from {}", item.url, item.source_label);

        let started = Instant::now();
        let mut guard = match RenderGuard::acquire(self.backend.as_ref(), &item.url).await {
            Ok(guard) => guard,
            Err(e) => {
                error!("Skipping {}: {}", item.url, e);
                self.state.broadcast_event(ClipEvent::ClipFailed {
                    item_id: item.id,
                    reason: e.to_string(),
                    timestamp: clipq_common::time::now(),
                });
                self.enter_idle().await;
                return None;
            }
        };

        let verdict = match guard.session() {
            Some(session) => {
                match AssertUnwindSafe(self.monitor.watch(session))
                    .catch_unwind()
                    .await
                {
                    Ok(verdict) => verdict,
                    Err(_) => {
                        error!("Monitor panicked during {}, letting clip complete", item.id);
                        Verdict::Completed
                    }
                }
            }
            None => {
                warn!("Render session missing after acquire");
                Verdict::Completed
            }
        };
        // Released before Idle and before the next pop, on every path
        guard.release().await;

        let elapsed = started.elapsed();
        info!("Clip {} ended: {} after {:?}", item.id, verdict, elapsed);
        self.state.broadcast_event(ClipEvent::ClipFinished {
            item_id: item.id,
            verdict,
            elapsed_ms: elapsed.as_millis() as u64,
            timestamp: clipq_common::time::now(),
        });
        self.enter_idle().await;

        Some(verdict)
    }

    async fn enter_idle(&self) {
        self.display.on_idle().await;
        self.state.set_playback_state(PlaybackState::Idle).await;
    }
}
