//! Shared player state
//!
//! Read by the HTTP handlers, written only by the orchestration task.

use chrono::{DateTime, Utc};
use clipq_common::events::ClipEvent;
use clipq_common::PlaybackState;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Clip currently on screen
#[derive(Debug, Clone, Serialize)]
pub struct NowPlaying {
    pub item_id: Uuid,
    pub url: String,
    pub source_label: String,
    pub category_label: String,
    pub started_at: DateTime<Utc>,
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes
pub struct SharedState {
    /// Idle or Playing
    pub playback_state: RwLock<PlaybackState>,

    /// Clip on screen (None while Idle)
    pub now_playing: RwLock<Option<NowPlaying>>,

    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<ClipEvent>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            playback_state: RwLock::new(PlaybackState::Idle),
            now_playing: RwLock::new(None),
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: ClipEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClipEvent> {
        self.event_tx.subscribe()
    }

    /// Get current playback state
    pub async fn get_playback_state(&self) -> PlaybackState {
        *self.playback_state.read().await
    }

    /// Set playback state, broadcasting the change
    ///
    /// Returns the previous state.
    pub async fn set_playback_state(&self, new_state: PlaybackState) -> PlaybackState {
        let old_state = {
            let mut guard = self.playback_state.write().await;
            std::mem::replace(&mut *guard, new_state)
        };

        if old_state != new_state {
            self.broadcast_event(ClipEvent::PlaybackStateChanged {
                old_state,
                new_state,
                timestamp: clipq_common::time::now(),
            });
        }

        old_state
    }

    /// Get the clip on screen
    pub async fn get_now_playing(&self) -> Option<NowPlaying> {
        self.now_playing.read().await.clone()
    }

    /// Set the clip on screen
    pub async fn set_now_playing(&self, now_playing: Option<NowPlaying>) {
        *self.now_playing.write().await = now_playing;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
