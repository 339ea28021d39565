//! # ClipQ Common Library
//!
//! Shared code for the ClipQ services:
//! - Common error type
//! - Configuration file resolution
//! - Event types (ClipEvent, PlaybackState, Verdict)
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{ClipEvent, PlaybackState, Verdict};
