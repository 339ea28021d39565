//! Configuration for clipq-player
//!
//! All settings live in one TOML file (see `clipq_common::config` for how the
//! file is located). Every key is optional; missing keys take the built-in
//! defaults below.
//!
//! ```toml
//! port = 5000
//!
//! [playback]
//! max_duration_ms = 20000
//!
//! [[detector.patterns]]
//! name = "not_available"
//! path = "patterns/not_available.png"
//!
//! [twitch]
//! client_id = "..."
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CLIPQ_CONFIG";

/// Top-level player configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// HTTP server port
    pub port: u16,

    pub logging: LoggingConfig,
    pub intake: IntakeConfig,
    pub playback: PlaybackSettings,
    pub detector: DetectorConfig,
    pub renderer: RendererConfig,

    /// Upstream clip API credentials (optional)
    ///
    /// Without it, `/clip` requests must carry a ready-made URL.
    pub twitch: Option<TwitchConfig>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            logging: LoggingConfig::default(),
            intake: IntakeConfig::default(),
            playback: PlaybackSettings::default(),
            detector: DetectorConfig::default(),
            renderer: RendererConfig::default(),
            twitch: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Which chat messages become clip requests
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Messages accepted verbatim (after trimming)
    pub keywords: Vec<String>,
    /// Regular expressions matched against the trimmed message
    ///
    /// With both lists empty every message is accepted.
    pub patterns: Vec<String>,
    /// Senders whose messages never count (compared case-insensitively)
    pub ignored_senders: Vec<String>,
    /// Minimum time between accepted requests for one channel
    pub cooldown_secs: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();

        Self {
            keywords: strings(&["10/10 clip", "lol", "lmao"]),
            patterns: strings(&[
                r"^LETSGO{5,10}$",
                r"^LET'?S\sGO{5,10}$",
                r"^AHAH{5,10}$",
                r"^WHAAA{5,10}T$",
                r"^LMFAOO{5,10}$",
                r"^LOOO{5,10}L$",
                r"^OMG{5,10}$",
                r"^LMAOO{5,10}$",
                r"^HYPEE{5,10}$",
                r"^OOOOO{5,10}$",
            ]),
            ignored_senders: strings(&["Nightbot", "StreamElements"]),
            cooldown_secs: 3600,
        }
    }
}

impl IntakeConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Queue and orchestration timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Maximum pending clips; the oldest is evicted beyond this
    pub queue_capacity: usize,
    /// Hard cap on a single clip's playback
    pub max_duration_ms: u64,
    /// Delay between screen samples
    pub poll_interval_ms: u64,
    /// Settle time after a skip before the next clip starts
    pub grace_delay_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 300,
            max_duration_ms: 20_000,
            poll_interval_ms: 2_000,
            grace_delay_ms: 1_000,
        }
    }
}

impl PlaybackSettings {
    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }
}

/// A reference image for an "unplayable" screen state
#[derive(Debug, Clone, Deserialize)]
pub struct PatternConfig {
    pub name: String,
    pub path: PathBuf,
}

/// Failure-detection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum normalized correlation counted as a match
    pub threshold: f32,
    /// Region-of-interest size, centred on the screen
    pub roi_width: u32,
    pub roi_height: u32,
    /// Downscale factor applied before matching (1.0 = full resolution)
    pub match_scale: f32,
    pub patterns: Vec<PatternConfig>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let pattern = |name: &str| PatternConfig {
            name: name.to_string(),
            path: PathBuf::from("patterns").join(format!("{}.png", name)),
        };

        Self {
            threshold: 0.8,
            roi_width: 800,
            roi_height: 600,
            match_scale: 0.5,
            patterns: vec![
                pattern("not_available"),
                pattern("unavailable_4000"),
                pattern("not_old_enough"),
            ],
        }
    }
}

/// Render session (WebDriver + Chrome) configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Launch a chromedriver per session; when false, `webdriver_url` must
    /// point at an already-running driver
    pub launch_chromedriver: bool,
    pub chromedriver_path: PathBuf,
    pub webdriver_port: u16,
    /// Overrides the `http://localhost:{webdriver_port}` default
    pub webdriver_url: Option<String>,
    pub connect_attempts: u32,
    pub connect_retry_ms: u64,
    /// Wait after navigation before clicking
    pub page_load_delay_ms: u64,
    /// Screen size; the start click lands on its centre
    pub screen_width: u32,
    pub screen_height: u32,
    /// Process-name fragment swept on release
    pub process_name: String,
    pub sweep_processes: bool,
    pub browser_args: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            launch_chromedriver: true,
            chromedriver_path: PathBuf::from("chromedriver"),
            webdriver_port: 9515,
            webdriver_url: None,
            connect_attempts: 40,
            connect_retry_ms: 150,
            page_load_delay_ms: 1_000,
            screen_width: 2560,
            screen_height: 1440,
            process_name: "chrome".to_string(),
            sweep_processes: true,
            browser_args: vec![
                "--start-fullscreen".to_string(),
                "--no-first-run".to_string(),
                "--no-default-browser-check".to_string(),
                "--autoplay-policy=no-user-gesture-required".to_string(),
            ],
        }
    }
}

impl RendererConfig {
    pub fn webdriver_url(&self) -> String {
        self.webdriver_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.webdriver_port))
    }

    /// Fixed on-screen coordinate of the start click
    pub fn click_point(&self) -> (i32, i32) {
        ((self.screen_width / 2) as i32, (self.screen_height / 2) as i32)
    }
}

/// Upstream (Twitch Helix) credentials and endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_embed_parent")]
    pub embed_parent: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_auth_base")]
    pub auth_base: String,
    #[serde(default = "default_refresh_attempts")]
    pub refresh_attempts: u32,
    #[serde(default = "default_refresh_retry_delay_ms")]
    pub refresh_retry_delay_ms: u64,
    /// Broadcaster ids kept in memory
    #[serde(default = "default_user_cache_capacity")]
    pub user_cache_capacity: usize,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            access_token: String::new(),
            refresh_token: String::new(),
            embed_parent: default_embed_parent(),
            api_base: default_api_base(),
            auth_base: default_auth_base(),
            refresh_attempts: default_refresh_attempts(),
            refresh_retry_delay_ms: default_refresh_retry_delay_ms(),
            user_cache_capacity: default_user_cache_capacity(),
        }
    }
}

fn default_embed_parent() -> String {
    "localhost".to_string()
}

fn default_api_base() -> String {
    "https://api.twitch.tv/helix".to_string()
}

fn default_auth_base() -> String {
    "https://id.twitch.tv".to_string()
}

fn default_refresh_attempts() -> u32 {
    3
}

fn default_refresh_retry_delay_ms() -> u64 {
    60_000
}

fn default_user_cache_capacity() -> usize {
    1024
}
