//! Clip request intake
//!
//! Decides whether a chat message turns into a clip. The message must be a
//! recognised reaction without a link, its sender must not be a channel bot,
//! and the channel must be outside its cooldown.

use crate::config::IntakeConfig;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Outcome of one intake decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    NotAReaction,
    ContainsLink,
    IgnoredSender,
    CoolingDown { remaining: Duration },
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted)
    }
}

/// Message filter plus per-channel cooldown
pub struct IntakeGate {
    keywords: Vec<String>,
    patterns: Vec<Regex>,
    ignored_senders: Vec<String>,
    cooldown: Duration,
    /// channel → last accepted request
    last_accepted: Mutex<HashMap<String, Instant>>,
}

impl IntakeGate {
    pub fn from_config(config: &IntakeConfig) -> Result<Self> {
        let patterns = config
            .patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .map_err(|e| Error::Config(format!("invalid intake pattern {}: {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            keywords: config.keywords.clone(),
            patterns,
            ignored_senders: config.ignored_senders.clone(),
            cooldown: config.cooldown(),
            last_accepted: Mutex::new(HashMap::new()),
        })
    }

    pub fn is_reaction(&self, message: &str) -> bool {
        if self.keywords.is_empty() && self.patterns.is_empty() {
            return true;
        }
        let message = message.trim();
        self.keywords.iter().any(|keyword| keyword == message)
            || self.patterns.iter().any(|pattern| pattern.is_match(message))
    }

    /// Check a request and, when accepted, start the channel's cooldown
    pub fn admit(&self, channel: &str, sender: &str, message: &str) -> Admission {
        if !self.is_reaction(message) {
            return Admission::NotAReaction;
        }
        if message.contains("http://") || message.contains("https://") {
            return Admission::ContainsLink;
        }
        if self
            .ignored_senders
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(sender))
        {
            return Admission::IgnoredSender;
        }

        self.claim(channel)
    }

    fn claim(&self, channel: &str) -> Admission {
        if self.cooldown.is_zero() {
            return Admission::Accepted;
        }

        let Ok(mut last_accepted) = self.last_accepted.lock() else {
            return Admission::Accepted;
        };
        let now = Instant::now();
        let cooldown = self.cooldown;
        last_accepted.retain(|_, at| now.duration_since(*at) < cooldown);

        let key = channel.to_lowercase();
        if let Some(at) = last_accepted.get(&key) {
            let remaining = cooldown - now.duration_since(*at);
            debug!("{} is cooling down for another {:?}", channel, remaining);
            return Admission::CoolingDown { remaining };
        }

        last_accepted.insert(key, now);
        Admission::Accepted
    }

    /// Channels currently cooling down
    pub fn cooling_channels(&self) -> usize {
        self.last_accepted.lock().map(|map| map.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> IntakeGate {
        IntakeGate::from_config(&IntakeConfig::default()).unwrap()
    }

    #[test]
    fn test_reactions() {
        let gate = gate();
        assert!(gate.is_reaction("lol"));
        assert!(gate.is_reaction("  10/10 clip "));
        assert!(gate.is_reaction("LETSGOOOOOO"));
        assert!(gate.is_reaction("LET'S GOOOOO"));
        assert!(gate.is_reaction("LOOOOOOOOL"));

        assert!(!gate.is_reaction("LUL"));
        assert!(!gate.is_reaction("LOL"));
        assert!(!gate.is_reaction("LETSGOOO"));
        assert!(!gate.is_reaction("lol that was great"));
        assert!(!gate.is_reaction(""));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = IntakeConfig {
            patterns: vec!["(unclosed".to_string()],
            ..IntakeConfig::default()
        };
        assert!(matches!(
            IntakeGate::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_rules() {
        let gate = gate();

        assert_eq!(gate.admit("a", "viewer", "LUL"), Admission::NotAReaction);
        assert_eq!(gate.admit("a", "nightbot", "lol"), Admission::IgnoredSender);
        // Rejections never start a cooldown
        assert_eq!(gate.admit("a", "viewer", "lol"), Admission::Accepted);
        assert_eq!(gate.cooling_channels(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_links_rejected() {
        let gate = IntakeGate::from_config(&IntakeConfig {
            keywords: Vec::new(),
            patterns: Vec::new(),
            ..IntakeConfig::default()
        })
        .unwrap();

        assert_eq!(
            gate.admit("a", "viewer", "look https://example.com"),
            Admission::ContainsLink
        );
        assert_eq!(gate.admit("a", "viewer", "anything goes"), Admission::Accepted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_per_channel() {
        let gate = gate();

        assert!(gate.admit("streamer", "viewer", "lol").is_accepted());
        assert!(gate.admit("other", "viewer", "lol").is_accepted());

        tokio::time::advance(Duration::from_secs(1800)).await;
        assert_eq!(
            gate.admit("Streamer", "viewer", "lol"),
            Admission::CoolingDown {
                remaining: Duration::from_secs(1800)
            }
        );

        tokio::time::advance(Duration::from_secs(1800)).await;
        assert!(gate.admit("streamer", "viewer", "lol").is_accepted());
        // The expired entry for "other" was dropped
        assert_eq!(gate.cooling_channels(), 1);
    }
}
