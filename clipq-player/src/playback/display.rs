//! Now-playing display
//!
//! The serializer announces each clip once, as it moves from Idle to
//! Playing, and clears the display when it returns to Idle.

use crate::playback::queue::QueueItem;
use crate::state::{NowPlaying, SharedState};
use async_trait::async_trait;
use clipq_common::events::ClipEvent;
use std::sync::Arc;
use tracing::info;

/// Receives now-playing announcements
#[async_trait]
pub trait NowPlayingSink: Send + Sync {
    /// A clip from `item.source_label` in `category_label` started playing
    async fn on_now_playing(&self, item: &QueueItem, category_label: &str);

    /// Nothing is playing any more
    async fn on_idle(&self) {}
}

/// Publishes now-playing through shared state, SSE and the log
pub struct StatusDisplay {
    state: Arc<SharedState>,
}

impl StatusDisplay {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl NowPlayingSink for StatusDisplay {
    async fn on_now_playing(&self, item: &QueueItem, category_label: &str) {
        let started_at = clipq_common::time::now();

        info!("Channel: {}", item.source_label);
        info!("Category: {}", category_label);

        self.state
            .set_now_playing(Some(NowPlaying {
                item_id: item.id,
                url: item.url.clone(),
                source_label: item.source_label.clone(),
                category_label: category_label.to_string(),
                started_at,
            }))
            .await;

        self.state.broadcast_event(ClipEvent::ClipStarted {
            item_id: item.id,
            source_label: item.source_label.clone(),
            category_label: category_label.to_string(),
            timestamp: started_at,
        });
    }

    async fn on_idle(&self) {
        self.state.set_now_playing(None).await;
    }
}
