//! Player facade
//!
//! Owns the orchestration context and the orchestration task. Everything
//! outside the playback module talks to playback through this type.

use crate::config::PlaybackSettings;
use crate::playback::display::{NowPlayingSink, StatusDisplay};
use crate::playback::serializer::SerializerParts;
use crate::playback::{
    CancellationSignal, ClipQueue, CrossThreadScheduler, OrchestratorCommand, PlaybackMonitor,
    PlaybackSerializer, QueueItem, RenderBackend, RoiSize, UnavailableDetector,
};
use crate::state::SharedState;
use crate::upstream::ChannelDirectory;
use clipq_common::events::ClipEvent;
use clipq_common::PlaybackState;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Collaborators the player is built from
pub struct PlayerDeps {
    pub state: Arc<SharedState>,
    pub backend: Arc<dyn RenderBackend>,
    pub detector: Arc<dyn UnavailableDetector>,
    pub directory: Arc<dyn ChannelDirectory>,
    /// Defaults to [`StatusDisplay`] over `state`
    pub display: Option<Arc<dyn NowPlayingSink>>,
    pub playback: PlaybackSettings,
    pub roi: RoiSize,
}

pub struct Player {
    queue: Arc<ClipQueue>,
    cancel: Arc<CancellationSignal>,
    scheduler: CrossThreadScheduler,
    state: Arc<SharedState>,
    serializer: Arc<PlaybackSerializer>,
    grace_delay: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Build the orchestration context and spawn the orchestration task
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(deps: PlayerDeps) -> Self {
        let queue = Arc::new(ClipQueue::new(deps.playback.queue_capacity));
        let cancel = Arc::new(CancellationSignal::new());
        let (scheduler, commands) = CrossThreadScheduler::channel();
        let display = deps
            .display
            .unwrap_or_else(|| Arc::new(StatusDisplay::new(Arc::clone(&deps.state))));

        let monitor = PlaybackMonitor::new(
            deps.detector,
            Arc::clone(&cancel),
            deps.roi,
            deps.playback.poll_interval(),
            deps.playback.max_duration(),
        );

        let serializer = Arc::new(PlaybackSerializer::new(SerializerParts {
            queue: Arc::clone(&queue),
            cancel: Arc::clone(&cancel),
            state: Arc::clone(&deps.state),
            backend: deps.backend,
            monitor,
            display,
            directory: deps.directory,
            grace_delay: deps.playback.grace_delay(),
        }));

        let task = tokio::spawn(Arc::clone(&serializer).run(commands));
        info!(
            "Player started (queue capacity {}, max clip duration {:?})",
            queue.capacity(),
            deps.playback.max_duration()
        );

        Self {
            queue,
            cancel,
            scheduler,
            state: deps.state,
            serializer,
            grace_delay: deps.playback.grace_delay(),
            task: Mutex::new(Some(task)),
        }
    }

    /// Enqueue a resolved clip and wake the orchestration task
    ///
    /// Returns the item evicted to make room, if any.
    pub fn submit_resolved_item(&self, item: QueueItem) -> Option<QueueItem> {
        let item_id = item.id;
        let source_label = item.source_label.clone();
        info!("Clip URL added to queue: {}", item.url);

        let evicted = self.queue.enqueue(item);
        if let Some(old) = &evicted {
            warn!("Queue full, dropped oldest clip {} ({})", old.id, old.url);
        }

        let queue_length = self.queue.len();
        debug!("Current queue length: {}", queue_length);
        self.state.broadcast_event(ClipEvent::ClipEnqueued {
            item_id,
            source_label,
            queue_length,
            evicted: evicted.as_ref().map(|old| old.id),
            timestamp: clipq_common::time::now(),
        });

        // A no-op when the orchestration task is already draining
        self.scheduler.submit(OrchestratorCommand::Resume);
        evicted
    }

    /// Skip the clip on screen
    ///
    /// While idle with clips waiting, playback resumes after the grace delay.
    pub async fn skip(&self) {
        self.cancel.raise();
        let state = self.state.get_playback_state().await;
        info!("Skip requested ({})", state);

        self.state.broadcast_event(ClipEvent::SkipRequested {
            state,
            timestamp: clipq_common::time::now(),
        });

        if state == PlaybackState::Idle && !self.queue.is_empty() {
            self.scheduler
                .submit(OrchestratorCommand::ResumeAfter(self.grace_delay));
        }
    }

    /// Stop the orchestration task, ending the clip on screen
    pub fn shutdown(&self) {
        self.serializer.request_stop();
        self.cancel.raise();
        self.scheduler.submit(OrchestratorCommand::Shutdown);
    }

    /// Wait for the orchestration task to finish
    pub async fn join(&self) {
        let task = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Orchestration task ended abnormally: {}", e);
            }
        }
    }

    pub fn queue(&self) -> &Arc<ClipQueue> {
        &self.queue
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn scheduler(&self) -> &CrossThreadScheduler {
        &self.scheduler
    }
}
