//! Upstream clip resolution
//!
//! Turns a channel name into a playable clip URL and looks up the channel's
//! current category for the now-playing display.

pub mod twitch;

use crate::error::Result;
use async_trait::async_trait;

pub use twitch::TwitchClient;

/// Resolves a clip request into a playable URL
#[async_trait]
pub trait ClipResolver: Send + Sync {
    /// `Ok(None)` when the request is valid but yields no clip
    /// (unknown channel, clip creation refused)
    async fn resolve(&self, channel: &str) -> Result<Option<String>>;
}

/// Looks up what a channel is currently streaming
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn category_for(&self, channel: &str) -> Option<String>;
}

/// Resolver used without upstream credentials
///
/// Accepts a request whose channel field is already an http(s) URL and
/// rejects everything else.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver;

#[async_trait]
impl ClipResolver for StaticResolver {
    async fn resolve(&self, channel: &str) -> Result<Option<String>> {
        let channel = channel.trim();
        if channel.starts_with("http://") || channel.starts_with("https://") {
            Ok(Some(channel.to_string()))
        } else {
            Ok(None)
        }
    }
}

/// Directory that knows no categories
#[derive(Debug, Default, Clone)]
pub struct NoDirectory;

#[async_trait]
impl ChannelDirectory for NoDirectory {
    async fn category_for(&self, _channel: &str) -> Option<String> {
        None
    }
}
