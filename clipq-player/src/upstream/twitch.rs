//! Twitch Helix client
//!
//! Creates a clip of a channel's live stream and looks up the channel's
//! current category. Authenticates with a user access token that is
//! refreshed through the OAuth endpoint once it expires.

use crate::config::TwitchConfig;
use crate::error::{Error, Result};
use crate::upstream::{ChannelDirectory, ClipResolver};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lru::LruCache;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Assumed lifetime of the configured access token
const INITIAL_TOKEN_LIFETIME_SECS: i64 = 3600;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Helix wraps every result list in `{"data": [...]}`
#[derive(Debug, Deserialize)]
struct HelixList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct HelixClip {
    id: String,
}

#[derive(Debug, Deserialize)]
struct HelixChannel {
    game_name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct TokenState {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

/// Helix API client
pub struct TwitchClient {
    http_client: reqwest::Client,
    config: TwitchConfig,
    /// Held across a refresh so concurrent callers wait for one refresh
    token: tokio::sync::Mutex<TokenState>,
    /// login → broadcaster id, least recently used evicted first
    user_ids: Mutex<LruCache<String, String>>,
}

impl TwitchClient {
    pub fn new(config: TwitchConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Upstream(format!("failed to build HTTP client: {}", e)))?;

        let token = TokenState {
            access_token: config.access_token.clone(),
            refresh_token: config.refresh_token.clone(),
            expires_at: Utc::now() + ChronoDuration::seconds(INITIAL_TOKEN_LIFETIME_SECS),
        };

        let cache_capacity =
            NonZeroUsize::new(config.user_cache_capacity).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            http_client,
            config,
            token: tokio::sync::Mutex::new(token),
            user_ids: Mutex::new(LruCache::new(cache_capacity)),
        })
    }

    /// Mark the current access token expired (next call refreshes it)
    pub async fn expire_token(&self) {
        self.token.lock().await.expires_at = Utc::now();
    }

    /// Current access token, refreshing it first if it has expired
    pub async fn valid_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if Utc::now() >= token.expires_at {
            *token = self.refresh(&token.refresh_token).await?;
        }
        Ok(token.access_token.clone())
    }

    /// Exchange the refresh token for a new access token
    ///
    /// Retried `refresh_attempts` times with `refresh_retry_delay_ms`
    /// between attempts.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenState> {
        let url = format!("{}/oauth2/token", self.config.auth_base.trim_end_matches('/'));
        let attempts = self.config.refresh_attempts.max(1);
        let delay = Duration::from_millis(self.config.refresh_retry_delay_ms);

        for attempt in 1..=attempts {
            let result = self
                .http_client
                .post(&url)
                .query(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", self.config.client_id.as_str()),
                    ("client_secret", self.config.client_secret.as_str()),
                ])
                .send()
                .await;

            match result {
                Ok(response) if response.status() == StatusCode::OK => {
                    let data: TokenResponse = response.json().await?;
                    info!("Access token refreshed");
                    return Ok(TokenState {
                        access_token: data.access_token,
                        refresh_token: data.refresh_token,
                        expires_at: Utc::now() + ChronoDuration::seconds(data.expires_in),
                    });
                }
                Ok(response) => {
                    warn!(
                        "Failed to refresh access token (attempt {}/{}): {}",
                        attempt,
                        attempts,
                        response.status()
                    );
                }
                Err(e) => {
                    warn!("Failed to refresh access token (attempt {}/{}): {}", attempt, attempts, e);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(Error::Upstream(format!(
            "access token refresh failed after {} attempts",
            attempts
        )))
    }

    fn helix_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Authenticated Helix request; `Ok(None)` when the status is not `expected`
    async fn helix<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        expected: StatusCode,
        what: &str,
    ) -> Result<Option<HelixList<T>>> {
        let token = self.valid_token().await?;
        let response = request
            .bearer_auth(token)
            .header("Client-Id", &self.config.client_id)
            .send()
            .await?;

        let status = response.status();
        if status != expected {
            warn!("Failed to {}: {}", what, status);
            return Ok(None);
        }

        Ok(Some(response.json().await?))
    }

    /// Broadcaster id for a login name
    pub async fn user_id(&self, login: &str) -> Result<Option<String>> {
        let key = login.to_lowercase();
        if let Some(id) = self.cached_user_id(&key) {
            return Ok(Some(id));
        }

        let request = self
            .http_client
            .get(self.helix_url("users"))
            .query(&[("login", login)]);
        let Some(list) = self
            .helix::<HelixUser>(request, StatusCode::OK, &format!("get user ID for {}", login))
            .await?
        else {
            return Ok(None);
        };

        match list.data.into_iter().next() {
            Some(user) => {
                if let Ok(mut cache) = self.user_ids.lock() {
                    cache.put(key, user.id.clone());
                }
                Ok(Some(user.id))
            }
            None => {
                info!("No user found with username {}", login);
                Ok(None)
            }
        }
    }

    fn cached_user_id(&self, key: &str) -> Option<String> {
        self.user_ids.lock().ok()?.get(key).cloned()
    }

    /// Create a clip of the live stream; returns the embeddable URL
    pub async fn create_clip(&self, broadcaster_id: &str) -> Result<Option<String>> {
        let request = self
            .http_client
            .post(self.helix_url("clips"))
            .query(&[("broadcaster_id", broadcaster_id)]);
        let Some(list) = self
            .helix::<HelixClip>(request, StatusCode::ACCEPTED, "create clip")
            .await?
        else {
            return Ok(None);
        };

        Ok(list
            .data
            .into_iter()
            .next()
            .map(|clip| embed_url(&clip.id, &self.config.embed_parent)))
    }

    /// Current game/category of a broadcaster
    pub async fn game_category(&self, broadcaster_id: &str) -> Result<Option<String>> {
        let request = self
            .http_client
            .get(self.helix_url("channels"))
            .query(&[("broadcaster_id", broadcaster_id)]);
        let Some(list) = self
            .helix::<HelixChannel>(
                request,
                StatusCode::OK,
                &format!("get game category for broadcaster ID {}", broadcaster_id),
            )
            .await?
        else {
            return Ok(None);
        };

        Ok(list.data.into_iter().next().map(|channel| channel.game_name))
    }

    async fn lookup_category(&self, channel: &str) -> Result<Option<String>> {
        match self.user_id(channel).await? {
            Some(id) => self.game_category(&id).await,
            None => Ok(None),
        }
    }
}

/// Embeddable player URL for a clip
pub fn embed_url(clip_id: &str, parent: &str) -> String {
    format!("https://clips.twitch.tv/embed?clip={}&parent={}", clip_id, parent)
}

#[async_trait]
impl ClipResolver for TwitchClient {
    async fn resolve(&self, channel: &str) -> Result<Option<String>> {
        let Some(broadcaster_id) = self.user_id(channel).await? else {
            warn!("Failed to get user ID for {}", channel);
            return Ok(None);
        };
        debug!("Creating clip for {} ({})", channel, broadcaster_id);
        self.create_clip(&broadcaster_id).await
    }
}

#[async_trait]
impl ChannelDirectory for TwitchClient {
    async fn category_for(&self, channel: &str) -> Option<String> {
        match self.lookup_category(channel).await {
            Ok(category) => category,
            Err(e) => {
                warn!("Category lookup for {} failed: {}", channel, e);
                None
            }
        }
    }
}
