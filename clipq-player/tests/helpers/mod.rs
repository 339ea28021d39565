//! Shared fakes for clipq-player integration tests
//!
//! - `FakeRenderer`: render backend that counts live sessions and records
//!   acquire/release times
//! - `BrightDetector`: reports "unavailable" when the ROI is mostly white
//! - `FixedDirectory`: channel directory with a fixed category
//!
//! Fake sessions pick their behaviour from the URL: a URL containing `fail`
//! cannot be acquired, one containing `unavailable` turns white 3 s in, one
//! containing `crash` panics on its first capture, one containing
//! `slow-release` takes 500 ms to tear down, and anything else plays cleanly.

#![allow(dead_code)]

use async_trait::async_trait;
use clipq_common::events::ClipEvent;
use clipq_common::Verdict;
use clipq_player::config::PlaybackSettings;
use clipq_player::error::{Error, Result};
use clipq_player::player::{Player, PlayerDeps};
use clipq_player::playback::{
    Detection, RenderBackend, RenderSession, RoiSize, UnavailableDetector,
};
use clipq_player::state::SharedState;
use clipq_player::upstream::ChannelDirectory;
use image::{GrayImage, Luma};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use uuid::Uuid;

/// When `unavailable` URLs start showing the banner
pub const UNAVAILABLE_AFTER: Duration = Duration::from_secs(3);

/// Teardown time of `slow-release` sessions
pub const SLOW_RELEASE: Duration = Duration::from_millis(500);

/// Session bookkeeping shared by the fake backend and its sessions
#[derive(Default)]
pub struct RenderStats {
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub failed: AtomicUsize,
    pub acquire_times: Mutex<Vec<(String, Instant)>>,
    pub release_times: Mutex<Vec<(String, Instant)>>,
}

impl RenderStats {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn acquire_time(&self, index: usize) -> Instant {
        self.acquire_times.lock().unwrap()[index].1
    }

    pub fn release_time(&self, index: usize) -> Instant {
        self.release_times.lock().unwrap()[index].1
    }

    pub fn acquired_urls(&self) -> Vec<String> {
        self.acquire_times
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    pub stats: Arc<RenderStats>,
}

impl FakeRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl RenderBackend for FakeRenderer {
    async fn acquire(&self, url: &str) -> Result<Box<dyn RenderSession>> {
        if url.contains("fail") {
            self.stats.failed.fetch_add(1, Ordering::SeqCst);
            return Err(Error::Acquisition(format!("cannot open {}", url)));
        }

        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live.fetch_max(live, Ordering::SeqCst);
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        self.stats
            .acquire_times
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        Ok(Box::new(FakeSession {
            url: url.to_string(),
            started: Instant::now(),
            bright_after: url.contains("unavailable").then_some(UNAVAILABLE_AFTER),
            crash: url.contains("crash"),
            release_delay: url.contains("slow-release").then_some(SLOW_RELEASE),
            stats: Arc::clone(&self.stats),
            released: false,
        }))
    }
}

pub struct FakeSession {
    url: String,
    started: Instant,
    bright_after: Option<Duration>,
    crash: bool,
    release_delay: Option<Duration>,
    stats: Arc<RenderStats>,
    released: bool,
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn capture_frame(&self) -> Result<GrayImage> {
        if self.crash {
            panic!("capture crashed for {}", self.url);
        }
        let bright = self
            .bright_after
            .is_some_and(|after| self.started.elapsed() >= after);
        Ok(GrayImage::from_pixel(64, 48, Luma([if bright { 255 } else { 10 }])))
    }

    async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(delay) = self.release_delay {
            tokio::time::sleep(delay).await;
        }
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        self.stats
            .release_times
            .lock()
            .unwrap()
            .push((self.url.clone(), Instant::now()));
    }
}

/// Detects a mostly white region of interest
pub struct BrightDetector;

impl UnavailableDetector for BrightDetector {
    fn detect(&self, roi: &GrayImage) -> Result<Option<Detection>> {
        let bright = roi.pixels().filter(|p| p.0[0] > 200).count();
        Ok((bright * 2 > roi.pixels().len()).then(|| Detection {
            pattern: "not_available".to_string(),
            score: 1.0,
        }))
    }
}

pub struct FixedDirectory(pub Option<String>);

/// Directory that answers after a delay
pub struct SlowDirectory(pub Duration);

#[async_trait]
impl ChannelDirectory for SlowDirectory {
    async fn category_for(&self, _channel: &str) -> Option<String> {
        tokio::time::sleep(self.0).await;
        None
    }
}

#[async_trait]
impl ChannelDirectory for FixedDirectory {
    async fn category_for(&self, _channel: &str) -> Option<String> {
        self.0.clone()
    }
}

/// Player over fakes with the default timings (20 s cap, 2 s poll, 1 s grace)
pub fn test_player(renderer: Arc<FakeRenderer>) -> (Player, Arc<SharedState>) {
    test_player_with(renderer, PlaybackSettings::default(), None)
}

pub fn test_player_with(
    renderer: Arc<FakeRenderer>,
    playback: PlaybackSettings,
    category: Option<&str>,
) -> (Player, Arc<SharedState>) {
    let directory = Arc::new(FixedDirectory(category.map(str::to_string)));
    test_player_with_directory(renderer, playback, directory)
}

pub fn test_player_with_directory(
    renderer: Arc<FakeRenderer>,
    playback: PlaybackSettings,
    directory: Arc<dyn ChannelDirectory>,
) -> (Player, Arc<SharedState>) {
    let state = Arc::new(SharedState::new());
    let player = Player::spawn(PlayerDeps {
        state: Arc::clone(&state),
        backend: renderer,
        detector: Arc::new(BrightDetector),
        directory,
        display: None,
        playback,
        roi: RoiSize {
            width: 32,
            height: 24,
        },
    });
    (player, state)
}

/// Outcome of one playback attempt, as seen on the event stream
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Finished {
        item_id: Uuid,
        verdict: Verdict,
        elapsed_ms: u64,
    },
    Failed {
        item_id: Uuid,
    },
}

/// Wait for the next ClipFinished or ClipFailed event
pub async fn next_outcome(rx: &mut broadcast::Receiver<ClipEvent>) -> Outcome {
    loop {
        match rx.recv().await.expect("event stream closed") {
            ClipEvent::ClipFinished {
                item_id,
                verdict,
                elapsed_ms,
                ..
            } => {
                return Outcome::Finished {
                    item_id,
                    verdict,
                    elapsed_ms,
                }
            }
            ClipEvent::ClipFailed { item_id, .. } => return Outcome::Failed { item_id },
            _ => {}
        }
    }
}

/// Wait for the next ClipStarted event; returns the item id
pub async fn next_started(rx: &mut broadcast::Receiver<ClipEvent>) -> Uuid {
    loop {
        if let ClipEvent::ClipStarted { item_id, .. } = rx.recv().await.expect("event stream closed") {
            return item_id;
        }
    }
}

/// Assert `actual` is within 50 ms above `expected`
pub fn assert_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(50),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}
