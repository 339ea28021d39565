//! Playback monitor
//!
//! Samples the centre of the screen at a fixed interval for the lifetime of
//! one clip and decides how the clip ended:
//!
//! - skip requested → [`Verdict::Cancelled`] (checked before every sample)
//! - reference pattern on screen → [`Verdict::DetectedUnavailable`]
//! - duration cap reached → [`Verdict::Completed`]
//!
//! Capture and matching failures fail open to `Completed`: a broken monitor
//! must never wedge the queue. A sample that does not finish within the time
//! left on the cap counts as a failure.

use crate::error::{Error, Result};
use crate::playback::cancel::CancellationSignal;
use crate::playback::detector::{Detection, UnavailableDetector};
use crate::playback::matcher::{self, RoiSize};
use crate::playback::render::RenderSession;
use clipq_common::Verdict;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Per-clip watchdog
pub struct PlaybackMonitor {
    detector: Arc<dyn UnavailableDetector>,
    cancel: Arc<CancellationSignal>,
    roi: RoiSize,
    poll_interval: Duration,
    max_duration: Duration,
}

impl PlaybackMonitor {
    pub fn new(
        detector: Arc<dyn UnavailableDetector>,
        cancel: Arc<CancellationSignal>,
        roi: RoiSize,
        poll_interval: Duration,
        max_duration: Duration,
    ) -> Self {
        Self {
            detector,
            cancel,
            roi,
            poll_interval,
            max_duration,
        }
    }

    /// Watch `session` until a verdict is reached
    pub async fn watch(&self, session: &dyn RenderSession) -> Verdict {
        let started = Instant::now();

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.max_duration {
                debug!("Duration cap reached after {:?}", elapsed);
                return Verdict::Completed;
            }

            if self.cancel.take() {
                info!("Skip requested after {:?}", elapsed);
                return Verdict::Cancelled;
            }

            let budget = self.max_duration.saturating_sub(elapsed).max(self.poll_interval);
            let sample = tokio::time::timeout(budget, self.sample(session))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::Monitor(format!("no frame within {:?}", budget)))
                });

            match sample {
                Ok(Some(detection)) => {
                    info!(
                        "Unavailable screen '{}' detected (score {:.3}) after {:?}",
                        detection.pattern, detection.score, elapsed
                    );
                    return Verdict::DetectedUnavailable;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Monitor failed, letting clip complete: {}", e);
                    return Verdict::Completed;
                }
            }

            let remaining = self.max_duration.saturating_sub(started.elapsed());
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }

    /// Capture one frame and run detection on its centre region
    async fn sample(&self, session: &dyn RenderSession) -> Result<Option<Detection>> {
        let frame = session.capture_frame().await?;
        let detector = Arc::clone(&self.detector);
        let roi = self.roi;

        tokio::task::spawn_blocking(move || {
            let region = matcher::crop_center(&frame, roi);
            detector.detect(&region)
        })
        .await
        .map_err(|e| Error::Monitor(format!("detection task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{GrayImage, Luma};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Frames turn white `bright_after` into the session
    struct ScriptedSession {
        started: Instant,
        bright_after: Option<Duration>,
        fail: bool,
        captures: AtomicUsize,
    }

    impl ScriptedSession {
        fn new(bright_after: Option<Duration>) -> Self {
            Self {
                started: Instant::now(),
                bright_after,
                fail: false,
                captures: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RenderSession for ScriptedSession {
        async fn capture_frame(&self) -> Result<GrayImage> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Monitor("capture failed".to_string()));
            }
            let bright = self
                .bright_after
                .is_some_and(|after| self.started.elapsed() >= after);
            Ok(GrayImage::from_pixel(40, 30, Luma([if bright { 255 } else { 0 }])))
        }

        async fn release(&mut self) {}
    }

    /// Reports a detection when the ROI is mostly white
    struct BrightDetector;

    impl UnavailableDetector for BrightDetector {
        fn detect(&self, roi: &GrayImage) -> Result<Option<Detection>> {
            let bright = roi.pixels().filter(|p| p.0[0] > 200).count();
            Ok((bright * 2 > roi.pixels().len()).then(|| Detection {
                pattern: "white".to_string(),
                score: 1.0,
            }))
        }
    }

    /// Capture never returns
    struct HungSession;

    #[async_trait]
    impl RenderSession for HungSession {
        async fn capture_frame(&self) -> Result<GrayImage> {
            std::future::pending().await
        }

        async fn release(&mut self) {}
    }

    struct PanickingDetector;

    impl UnavailableDetector for PanickingDetector {
        fn detect(&self, _roi: &GrayImage) -> Result<Option<Detection>> {
            panic!("matcher bug");
        }
    }

    fn assert_elapsed(start: Instant, secs: u64) {
        let elapsed = start.elapsed();
        let expected = Duration::from_secs(secs);
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(50),
            "elapsed {:?}",
            elapsed
        );
    }

    fn monitor(detector: Arc<dyn UnavailableDetector>, cancel: Arc<CancellationSignal>) -> PlaybackMonitor {
        PlaybackMonitor::new(
            detector,
            cancel,
            RoiSize { width: 20, height: 10 },
            Duration::from_secs(2),
            Duration::from_secs(20),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_run_completes_at_cap() {
        let monitor = monitor(Arc::new(BrightDetector), Arc::new(CancellationSignal::new()));
        let session = ScriptedSession::new(None);

        let start = Instant::now();
        let verdict = monitor.watch(&session).await;

        assert_eq!(verdict, Verdict::Completed);
        assert_elapsed(start, 20);
        // Samples at 0, 2, ..., 18
        assert_eq!(session.captures.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cap_not_multiple_of_poll() {
        let monitor = PlaybackMonitor::new(
            Arc::new(BrightDetector),
            Arc::new(CancellationSignal::new()),
            RoiSize { width: 20, height: 10 },
            Duration::from_secs(3),
            Duration::from_secs(10),
        );
        let session = ScriptedSession::new(None);

        let start = Instant::now();
        assert_eq!(monitor.watch(&session).await, Verdict::Completed);
        assert_elapsed(start, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_at_three_seconds() {
        let monitor = monitor(Arc::new(BrightDetector), Arc::new(CancellationSignal::new()));
        let session = ScriptedSession::new(Some(Duration::from_secs(3)));

        let start = Instant::now();
        let verdict = monitor.watch(&session).await;

        assert_eq!(verdict, Verdict::DetectedUnavailable);
        // First sample at or after 3 s is the one at 4 s
        assert_elapsed(start, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_raise_cancels_within_one_poll() {
        let cancel = Arc::new(CancellationSignal::new());
        let monitor = monitor(Arc::new(BrightDetector), Arc::clone(&cancel));
        let session = ScriptedSession::new(None);

        let raiser = Arc::clone(&cancel);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5_500)).await;
            raiser.raise();
        });

        let start = Instant::now();
        let verdict = monitor.watch(&session).await;

        assert_eq!(verdict, Verdict::Cancelled);
        assert_elapsed(start, 6);
        // The raise was consumed
        assert!(!cancel.is_raised());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_checked_before_first_sample() {
        let cancel = Arc::new(CancellationSignal::new());
        cancel.raise();
        let monitor = monitor(Arc::new(BrightDetector), cancel);
        let session = ScriptedSession::new(None);

        assert_eq!(monitor.watch(&session).await, Verdict::Cancelled);
        assert_eq!(session.captures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_error_fails_open() {
        let monitor = monitor(Arc::new(BrightDetector), Arc::new(CancellationSignal::new()));
        let mut session = ScriptedSession::new(None);
        session.fail = true;

        assert_eq!(monitor.watch(&session).await, Verdict::Completed);
        assert_eq!(session.captures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_capture_fails_open_at_cap() {
        let monitor = monitor(Arc::new(BrightDetector), Arc::new(CancellationSignal::new()));

        let start = Instant::now();
        assert_eq!(monitor.watch(&HungSession).await, Verdict::Completed);
        assert_elapsed(start, 20);
    }

    #[tokio::test]
    async fn test_panicking_detector_fails_open() {
        let monitor = monitor(Arc::new(PanickingDetector), Arc::new(CancellationSignal::new()));
        let session = ScriptedSession::new(None);

        assert_eq!(monitor.watch(&session).await, Verdict::Completed);
    }
}
