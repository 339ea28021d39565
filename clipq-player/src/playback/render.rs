//! Render session lifecycle
//!
//! One session per playback attempt: acquire (create, navigate, start
//! playback), sample frames, release (tear down, kill the process tree).
//!
//! [`RenderGuard`] scopes a session to the attempt that acquired it. Explicit
//! `release()` is the normal path; if the guard is dropped unreleased (early
//! return, panic unwind) the release is scheduled on the runtime instead, so
//! no path leaks the browser.

use crate::error::Result;
use async_trait::async_trait;
use image::GrayImage;
use tracing::{debug, warn};

/// Creates render sessions
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Create a session, navigate it to `url`, and start playback
    ///
    /// On error the backend has already torn down anything it started; the
    /// caller holds no session.
    async fn acquire(&self, url: &str) -> Result<Box<dyn RenderSession>>;
}

/// A live render session
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Capture the current screen as single-channel intensity
    async fn capture_frame(&self) -> Result<GrayImage>;

    /// Tear down the session and terminate its processes
    ///
    /// Idempotent: a second call is a no-op. Teardown errors are logged, never
    /// returned, and never skip the process cleanup.
    async fn release(&mut self);
}

/// Scoped ownership of one render session
pub struct RenderGuard {
    session: Option<Box<dyn RenderSession>>,
}

impl RenderGuard {
    /// Acquire a session from `backend`
    pub async fn acquire(backend: &dyn RenderBackend, url: &str) -> Result<Self> {
        let session = backend.acquire(url).await?;
        debug!("Render session acquired for {}", url);
        Ok(Self {
            session: Some(session),
        })
    }

    /// The live session, or None once released
    pub fn session(&self) -> Option<&dyn RenderSession> {
        self.session.as_deref()
    }

    pub fn is_released(&self) -> bool {
        self.session.is_none()
    }

    /// Release the session (idempotent)
    pub async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.release().await;
            debug!("Render session released");
        }
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Render session dropped without release, releasing in background");
                handle.spawn(async move {
                    session.release().await;
                });
            }
            Err(_) => {
                warn!("Render session dropped outside a runtime; process sweep skipped");
            }
        }
    }
}
