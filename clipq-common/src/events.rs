//! Event types for the ClipQ event system
//!
//! Events are broadcast by the player and serialized for SSE transmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Orchestrator playback state
///
/// Idle means no render session is alive; Playing means exactly one is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

/// Why a playback attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Played until the duration cap (or the monitor failed open)
    Completed,
    /// A reference "unavailable" pattern was found on screen
    DetectedUnavailable,
    /// Skip requested while playing
    Cancelled,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Completed => write!(f, "completed"),
            Verdict::DetectedUnavailable => write!(f, "detected_unavailable"),
            Verdict::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// ClipQ event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClipEvent {
    /// Orchestrator moved between Idle and Playing
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// A resolved clip was added to the queue
    ClipEnqueued {
        item_id: Uuid,
        source_label: String,
        queue_length: usize,
        /// Oldest item dropped to keep the queue within capacity
        evicted: Option<Uuid>,
        timestamp: DateTime<Utc>,
    },

    /// A clip started playing
    ClipStarted {
        item_id: Uuid,
        source_label: String,
        category_label: String,
        timestamp: DateTime<Utc>,
    },

    /// A clip finished with a monitor verdict
    ClipFinished {
        item_id: Uuid,
        verdict: Verdict,
        elapsed_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A clip could not be played (render session failed)
    ClipFailed {
        item_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Skip was requested by the external trigger
    SkipRequested {
        state: PlaybackState,
        timestamp: DateTime<Utc>,
    },
}

impl ClipEvent {
    /// Event type name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ClipEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            ClipEvent::ClipEnqueued { .. } => "ClipEnqueued",
            ClipEvent::ClipStarted { .. } => "ClipStarted",
            ClipEvent::ClipFinished { .. } => "ClipFinished",
            ClipEvent::ClipFailed { .. } => "ClipFailed",
            ClipEvent::SkipRequested { .. } => "SkipRequested",
        }
    }
}
