//! # ClipQ Player Library (clipq-player)
//!
//! Plays requested stream clips one at a time in a browser and skips clips
//! whose page shows an "unavailable" banner.
//!
//! **Architecture:** HTTP intake → upstream resolver → bounded queue →
//! single orchestration task (render session + screen monitor)

pub mod api;
pub mod config;
pub mod error;
pub mod intake;
pub mod playback;
pub mod player;
pub mod state;
pub mod upstream;

pub use error::{Error, Result};
pub use player::Player;
pub use state::SharedState;
