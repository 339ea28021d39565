//! Playback orchestration: queue, render session, monitor, serializer

pub mod cancel;
pub mod detector;
pub mod display;
pub mod matcher;
pub mod monitor;
pub mod process;
pub mod queue;
pub mod render;
pub mod scheduler;
pub mod serializer;
pub mod webdriver;

pub use cancel::CancellationSignal;
pub use detector::{Detection, ReferencePattern, TemplateDetector, UnavailableDetector};
pub use display::{NowPlayingSink, StatusDisplay};
pub use matcher::RoiSize;
pub use monitor::PlaybackMonitor;
pub use queue::{ClipQueue, QueueItem};
pub use render::{RenderBackend, RenderGuard, RenderSession};
pub use scheduler::{CrossThreadScheduler, OrchestratorCommand};
pub use serializer::PlaybackSerializer;
pub use webdriver::WebDriverRenderer;
