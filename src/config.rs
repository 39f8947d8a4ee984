//! Configuration management for escaneo using the prefer crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{ClientError, ScanClient};
use crate::models::CompressionLevel;
use crate::monitor::MonitorSettings;
use crate::services::ScreenSize;

/// Default scanning service location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Scanning service base URL.
    pub base_url: String,
    /// User agent for HTTP requests. `None` uses the crate default.
    pub user_agent: Option<String>,
    /// Request timeout in seconds. Scans block until the scanner is done.
    pub request_timeout: u64,
    /// Delay between progress polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Seconds a successful completion stays on screen.
    pub auto_hide_secs: u64,
    /// Compression applied to scanned PDFs after a scan.
    pub compression: CompressionLevel,
    /// Open the preview after every PDF scan.
    pub auto_preview: bool,
    /// Screen size used to place the preview window, in pixels.
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let screen = ScreenSize::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            request_timeout: 300,
            poll_interval_ms: 500,
            auto_hide_secs: 5,
            compression: CompressionLevel::Off,
            auto_preview: false,
            screen_width: screen.width,
            screen_height: screen.height,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Monitor timings. `draw` selects whether the terminal bar is drawn.
    pub fn monitor_settings(&self, draw: bool) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            auto_hide_after: Duration::from_secs(self.auto_hide_secs),
            draw,
        }
    }

    pub fn screen(&self) -> ScreenSize {
        ScreenSize {
            width: self.screen_width,
            height: self.screen_height,
        }
    }

    /// Build a client for the configured service.
    pub fn client(&self) -> Result<ScanClient, ClientError> {
        ScanClient::with_user_agent(
            &self.base_url,
            self.request_timeout(),
            self.user_agent.as_deref(),
        )
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Scanning service base URL, e.g. `http://scanner:5000`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// User agent sent with every request.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// Delay between progress polls in milliseconds.
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    /// Seconds a successful completion stays on screen.
    #[serde(default)]
    pub auto_hide_secs: Option<u64>,
    /// One of none, low, medium, high, maximum.
    #[serde(default)]
    pub compression: Option<String>,
    /// Open the preview after every PDF scan.
    #[serde(default)]
    pub auto_preview: Option<bool>,
    /// Screen width in pixels for preview placement.
    #[serde(default)]
    pub screen_width: Option<u32>,
    /// Screen height in pixels for preview placement.
    #[serde(default)]
    pub screen_height: Option<u32>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers escaneo config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("escaneo").await {
            Ok(pref_config) => {
                let base_url: Option<String> = pref_config.get("base_url").ok();
                let user_agent: Option<String> = pref_config.get("user_agent").ok();
                let request_timeout: Option<u64> = pref_config.get("request_timeout").ok();
                let poll_interval_ms: Option<u64> =
                    pref_config.get("poll_interval_ms").ok();
                let auto_hide_secs: Option<u64> = pref_config.get("auto_hide_secs").ok();
                let compression: Option<String> = pref_config.get("compression").ok();
                let auto_preview: Option<bool> = pref_config.get("auto_preview").ok();
                let screen_width: Option<u32> = pref_config.get("screen_width").ok();
                let screen_height: Option<u32> = pref_config.get("screen_height").ok();

                Config {
                    base_url,
                    user_agent,
                    request_timeout,
                    poll_interval_ms,
                    auto_hide_secs,
                    compression,
                    auto_preview,
                    screen_width,
                    screen_height,
                }
            }
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref base_url) = self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(interval) = self.poll_interval_ms {
            // A zero period would spin.
            settings.poll_interval_ms = interval.max(1);
        }
        if let Some(secs) = self.auto_hide_secs {
            settings.auto_hide_secs = secs;
        }
        if let Some(ref raw) = self.compression {
            match CompressionLevel::parse(raw) {
                Some(level) => settings.compression = level,
                None => warn!("Ignoring unknown compression level in config: {}", raw),
            }
        }
        if let Some(auto_preview) = self.auto_preview {
            settings.auto_preview = auto_preview;
        }
        if let Some(width) = self.screen_width {
            settings.screen_width = width;
        }
        if let Some(height) = self.screen_height {
            settings.screen_height = height;
        }
    }
}

/// Load settings from configuration (async version).
pub async fn load_settings() -> Settings {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.base_url, "http://localhost:5000");
        let monitor = settings.monitor_settings(false);
        assert_eq!(monitor.poll_interval, Duration::from_millis(500));
        assert_eq!(monitor.auto_hide_after, Duration::from_secs(5));
        assert!(settings.compression.is_off());
    }

    #[test]
    fn test_apply_to_settings() {
        let config = Config {
            base_url: Some("http://scanner.local:8080".to_string()),
            poll_interval_ms: Some(250),
            compression: Some("High".to_string()),
            auto_preview: Some(true),
            screen_width: Some(2560),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings);

        assert_eq!(settings.base_url, "http://scanner.local:8080");
        assert_eq!(settings.poll_interval_ms, 250);
        assert_eq!(settings.compression, CompressionLevel::High);
        assert!(settings.auto_preview);
        assert_eq!(settings.screen().width, 2560);
        assert_eq!(settings.screen().height, 1080);
        assert_eq!(settings.request_timeout, 300);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let config = Config {
            compression: Some("extreme".to_string()),
            poll_interval_ms: Some(0),
            ..Default::default()
        };
        let mut settings = Settings {
            compression: CompressionLevel::Low,
            ..Default::default()
        };
        config.apply_to_settings(&mut settings);

        assert_eq!(settings.compression, CompressionLevel::Low);
        assert_eq!(settings.poll_interval_ms, 1);
    }

    #[test]
    fn test_client_from_settings() {
        let settings = Settings {
            base_url: "http://localhost:5000/app".to_string(),
            ..Default::default()
        };
        let client = settings.client().unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:5000/app/");
    }
}
