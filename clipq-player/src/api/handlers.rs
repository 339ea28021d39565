//! HTTP request handlers

use crate::api::server::AppContext;
use crate::intake::Admission;
use crate::playback::QueueItem;
use crate::state::NowPlaying;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use clipq_common::PlaybackState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Response to an accepted clip request
pub const CLIP_ACCEPTED: &str = "Keyword received and clip creation started";

/// Response to a message that does not warrant a clip
pub const CLIP_IGNORED: &str = "Message ignored";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Body posted by the chat bot
#[derive(Debug, Deserialize)]
pub struct ClipRequest {
    #[serde(default)]
    channel: String,
    /// Chat message that triggered the request
    #[serde(default)]
    message: String,
    /// Display name of the message's author
    #[serde(default)]
    sender: String,
}

#[derive(Debug, Serialize)]
pub struct PlaybackStateResponse {
    state: PlaybackState,
    now_playing: Option<NowPlaying>,
    queue_length: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    queue: Vec<QueueEntryInfo>,
}

#[derive(Debug, Serialize)]
pub struct QueueEntryInfo {
    id: Uuid,
    url: String,
    source_label: String,
    enqueued_at: DateTime<Utc>,
}

impl From<QueueItem> for QueueEntryInfo {
    fn from(item: QueueItem) -> Self {
        Self {
            id: item.id,
            url: item.url,
            source_label: item.source_label,
            enqueued_at: item.enqueued_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "clipq-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /clip - Resolve a channel into a clip and queue it
///
/// Messages that are not reactions are acknowledged and dropped; a channel
/// inside its cooldown gets 429. Accepted requests respond immediately;
/// resolution runs in the background and a failed resolution is only logged.
pub async fn submit_clip(
    State(ctx): State<AppContext>,
    Json(req): Json<ClipRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    let channel = req.channel.trim().to_string();
    if channel.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(StatusResponse {
                status: "channel is required".to_string(),
            }),
        ));
    }

    match ctx.intake.admit(&channel, &req.sender, &req.message) {
        Admission::Accepted => {}
        Admission::CoolingDown { remaining } => {
            info!("Message not sent due to rate limit for channel: {}", channel);
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(StatusResponse {
                    status: format!("channel on cooldown for {}s", remaining.as_secs()),
                }),
            ));
        }
        rejected => {
            debug!("Ignoring message in {}: {:?}", channel, rejected);
            return Ok(Json(StatusResponse {
                status: CLIP_IGNORED.to_string(),
            }));
        }
    }

    info!("Keyword received: {}, {}", channel, req.message);

    let resolver = ctx.resolver.clone();
    let player = ctx.player.clone();
    tokio::spawn(async move {
        match resolver.resolve(&channel).await {
            Ok(Some(url)) => {
                player.submit_resolved_item(QueueItem::new(url, channel));
            }
            Ok(None) => info!("No clip created for {}", channel),
            Err(e) => warn!("Clip creation for {} failed: {}", channel, e),
        }
    });

    Ok(Json(StatusResponse {
        status: CLIP_ACCEPTED.to_string(),
    }))
}

/// POST /playback/skip - End the clip on screen
pub async fn skip(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    ctx.player.skip().await;
    Json(StatusResponse {
        status: "skip requested".to_string(),
    })
}

/// GET /playback/state
pub async fn get_playback_state(State(ctx): State<AppContext>) -> Json<PlaybackStateResponse> {
    Json(PlaybackStateResponse {
        state: ctx.state.get_playback_state().await,
        now_playing: ctx.state.get_now_playing().await,
        queue_length: ctx.player.queue().len(),
    })
}

/// GET /playback/queue - Clips waiting to play, oldest first
pub async fn get_queue(State(ctx): State<AppContext>) -> Json<QueueResponse> {
    Json(QueueResponse {
        queue: ctx
            .player
            .queue()
            .snapshot()
            .into_iter()
            .map(QueueEntryInfo::from)
            .collect(),
    })
}
