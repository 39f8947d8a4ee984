//! Preview windows for scanned documents.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Preview window width in pixels.
pub const PREVIEW_WIDTH: u32 = 1200;
/// Preview window height in pixels.
pub const PREVIEW_HEIGHT: u32 = 800;

#[derive(Debug, Error)]
pub enum PreviewError {
    /// Nothing could open the window. Shown to the user as a warning.
    #[error("Preview window was blocked: {0}")]
    Blocked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// An opened preview and where it was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewWindow {
    pub url: Url,
    pub width: u32,
    pub height: u32,
    pub left: u32,
    pub top: u32,
}

impl PreviewWindow {
    /// A preview-sized window centered on `screen`, pinned to the top-left
    /// corner when the screen is smaller than the window.
    pub fn centered(url: Url, screen: ScreenSize) -> Self {
        Self {
            url,
            width: PREVIEW_WIDTH,
            height: PREVIEW_HEIGHT,
            left: screen.width.saturating_sub(PREVIEW_WIDTH) / 2,
            top: screen.height.saturating_sub(PREVIEW_HEIGHT) / 2,
        }
    }
}

/// Something that can show a URL to the user.
#[async_trait]
pub trait Opener: Send + Sync {
    async fn open(&self, window: &PreviewWindow) -> Result<(), PreviewError>;
}

/// Opens URLs with the platform's default handler.
#[derive(Debug, Clone)]
pub struct SystemOpener {
    program: Option<PathBuf>,
    args: Vec<String>,
}

impl SystemOpener {
    /// Locate the platform opener on `PATH`.
    pub fn detect() -> Self {
        let (name, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
            ("open", &[])
        } else if cfg!(windows) {
            ("cmd", &["/C", "start", ""])
        } else {
            ("xdg-open", &[])
        };

        let program = which::which(name).ok();
        debug!("Preview opener {}: {:?}", name, program);

        Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Opener for SystemOpener {
    async fn open(&self, window: &PreviewWindow) -> Result<(), PreviewError> {
        let Some(program) = &self.program else {
            return Err(PreviewError::Blocked(
                "no program found to open the preview".to_string(),
            ));
        };

        let status = tokio::process::Command::new(program)
            .args(&self.args)
            .arg(window.url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| PreviewError::Blocked(e.to_string()))?;

        if status.success() {
            Ok(())
        } else {
            Err(PreviewError::Blocked(format!(
                "{} exited with {}",
                program.display(),
                status
            )))
        }
    }
}

/// Opens preview windows centered on the configured screen.
#[derive(Clone)]
pub struct PreviewLauncher {
    opener: std::sync::Arc<dyn Opener>,
    screen: ScreenSize,
}

impl std::fmt::Debug for PreviewLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewLauncher")
            .field("screen", &self.screen)
            .finish_non_exhaustive()
    }
}

impl PreviewLauncher {
    pub fn new(opener: std::sync::Arc<dyn Opener>, screen: ScreenSize) -> Self {
        Self { opener, screen }
    }

    /// Launcher using the platform opener.
    pub fn system(screen: ScreenSize) -> Self {
        Self::new(std::sync::Arc::new(SystemOpener::detect()), screen)
    }

    pub async fn open(&self, url: Url) -> Result<PreviewWindow, PreviewError> {
        let window = PreviewWindow::centered(url, self.screen);
        self.opener.open(&window).await?;
        info!(
            "Opened preview {} ({}x{} at {},{})",
            window.url, window.width, window.height, window.left, window.top
        );
        Ok(window)
    }
}

/// Message posted back by a preview window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PreviewMessage {
    /// The user asked to process the previewed document.
    Process { filename: String },
    #[serde(other)]
    Other,
}

impl PreviewMessage {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// React to a preview message. Processing requests are only logged for now.
pub fn handle_preview_message(message: &PreviewMessage) {
    match message {
        PreviewMessage::Process { filename } => {
            info!("Preview requested processing of {}", filename);
        }
        PreviewMessage::Other => debug!("Ignoring preview message"),
    }
}
