//! HTTP API: clip intake, playback status and control, SSE events

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, run, AppContext};
