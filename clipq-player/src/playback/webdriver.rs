//! WebDriver-backed render sessions
//!
//! Each session launches its own chromedriver (unless an external driver is
//! configured), opens a full-screen Chrome window on the clip URL, and clicks
//! the centre of the screen to start playback. Frames are WebDriver
//! screenshots, which cover the whole screen while Chrome is full-screen.

use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::playback::process;
use crate::playback::render::{RenderBackend, RenderSession};
use async_trait::async_trait;
use fantoccini::actions::{InputSource, MouseActions, PointerAction, MOUSE_BUTTON_LEFT};
use fantoccini::{Client, ClientBuilder};
use image::GrayImage;
use serde_json::{json, Map, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Creates one Chrome session per clip
pub struct WebDriverRenderer {
    config: RendererConfig,
}

impl WebDriverRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": self.config.browser_args,
                // Keep Chrome's own logging out of our output
                "excludeSwitches": ["enable-logging", "enable-automation"]
            }),
        );
        caps
    }

    fn launch_driver(&self) -> Result<Option<Child>> {
        if !self.config.launch_chromedriver {
            return Ok(None);
        }

        let child = Command::new(&self.config.chromedriver_path)
            .arg(format!("--port={}", self.config.webdriver_port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Acquisition(format!(
                    "failed to launch {}: {}",
                    self.config.chromedriver_path.display(),
                    e
                ))
            })?;

        debug!("Launched chromedriver on port {}", self.config.webdriver_port);
        Ok(Some(child))
    }

    /// Connect to the driver, retrying while it starts up
    async fn connect(&self) -> Result<Client> {
        let url = self.config.webdriver_url();
        let attempts = self.config.connect_attempts.max(1);
        let mut last_err = String::new();

        for attempt in 1..=attempts {
            match ClientBuilder::native()
                .capabilities(self.capabilities())
                .connect(&url)
                .await
            {
                Ok(client) => {
                    debug!("WebDriver session created on attempt {}", attempt);
                    return Ok(client);
                }
                Err(e) => {
                    last_err = e.to_string();
                    tokio::time::sleep(Duration::from_millis(self.config.connect_retry_ms)).await;
                }
            }
        }

        Err(Error::Acquisition(format!(
            "failed to connect to webdriver at {} after {} attempts: {}",
            url, attempts, last_err
        )))
    }

    async fn start_playback(&self, client: &Client, url: &str) -> Result<()> {
        client
            .goto(url)
            .await
            .map_err(|e| Error::Acquisition(format!("navigation to {} failed: {}", url, e)))?;

        // Give the page time to load before clicking
        tokio::time::sleep(Duration::from_millis(self.config.page_load_delay_ms)).await;

        let (x, y) = self.config.click_point();
        let click = MouseActions::new("mouse".to_string())
            .then(PointerAction::MoveTo {
                duration: None,
                x: x.into(),
                y: y.into(),
            })
            .then(PointerAction::Down {
                button: MOUSE_BUTTON_LEFT,
            })
            .then(PointerAction::Up {
                button: MOUSE_BUTTON_LEFT,
            });

        client
            .perform_actions(click)
            .await
            .map_err(|e| Error::Acquisition(format!("start click failed: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl RenderBackend for WebDriverRenderer {
    async fn acquire(&self, url: &str) -> Result<Box<dyn RenderSession>> {
        let driver = self.launch_driver()?;

        // From here on the session owns the driver process, so every failure
        // path below tears it down through release().
        let mut session = WebDriverSession {
            client: None,
            driver,
            process_name: self.config.process_name.clone(),
            sweep_processes: self.config.sweep_processes,
        };

        let result = async {
            let client = self.connect().await?;
            session.client = Some(client.clone());
            self.start_playback(&client, url).await
        }
        .await;

        match result {
            Ok(()) => {
                info!("Render session started: {}", url);
                Ok(Box::new(session))
            }
            Err(e) => {
                session.release().await;
                Err(e)
            }
        }
    }
}

/// A live Chrome window driven over WebDriver
pub struct WebDriverSession {
    client: Option<Client>,
    driver: Option<Child>,
    process_name: String,
    sweep_processes: bool,
}

#[async_trait]
impl RenderSession for WebDriverSession {
    async fn capture_frame(&self) -> Result<GrayImage> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::Monitor("session already released".to_string()))?;

        let png = client
            .screenshot()
            .await
            .map_err(|e| Error::Monitor(format!("screenshot failed: {}", e)))?;

        tokio::task::spawn_blocking(move || -> Result<GrayImage> {
            Ok(image::load_from_memory(&png)?.to_luma8())
        })
        .await
        .map_err(|e| Error::Monitor(format!("frame decode task failed: {}", e)))?
    }

    async fn release(&mut self) {
        let had_resources = self.client.is_some() || self.driver.is_some();

        if let Some(client) = self.client.take() {
            if let Err(e) = client.close().await {
                warn!("WebDriver session close failed: {}", e);
            }
        }

        if let Some(mut driver) = self.driver.take() {
            if let Err(e) = driver.kill().await {
                debug!("chromedriver already exited: {}", e);
            }
        }

        if had_resources && self.sweep_processes {
            let fragment = self.process_name.clone();
            if let Err(e) =
                tokio::task::spawn_blocking(move || process::terminate_matching(&fragment)).await
            {
                warn!("Process sweep task failed: {}", e);
            }
        }
    }
}
