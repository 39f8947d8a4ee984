//! Follow-up actions run after a successful scan.
//!
//! Hooks run in registration order once the scan call has returned, each
//! seeing the scan outcome. A failing hook is logged and recorded; the
//! remaining hooks still run.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use super::preview::{PreviewError, PreviewLauncher, PreviewWindow};
use crate::client::{ClientError, ScanClient};
use crate::models::{CompressOutcome, CompressRequest, CompressionLevel, ScanOutcome};

/// What a hook did.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    Compressed(CompressOutcome),
    PreviewOpened(PreviewWindow),
    Skipped(String),
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Preview(#[from] PreviewError),
}

#[async_trait]
pub trait PostScanHook: Send + Sync {
    fn name(&self) -> &str;

    async fn after_scan(&self, outcome: &ScanOutcome) -> Result<HookOutcome, HookError>;
}

/// Result of one hook in a chain run.
#[derive(Debug)]
pub struct HookRun {
    pub hook: String,
    pub result: Result<HookOutcome, HookError>,
}

/// Ordered list of post-scan hooks.
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Box<dyn PostScanHook>>,
}

impl std::fmt::Debug for HookChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: impl PostScanHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn with(mut self, hook: impl PostScanHook + 'static) -> Self {
        self.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub async fn run(&self, outcome: &ScanOutcome) -> Vec<HookRun> {
        let mut runs = Vec::with_capacity(self.hooks.len());
        for hook in &self.hooks {
            let result = hook.after_scan(outcome).await;
            match &result {
                Ok(done) => debug!("Post-scan hook {} finished: {:?}", hook.name(), done),
                Err(e) => warn!("Post-scan hook {} failed: {}", hook.name(), e),
            }
            runs.push(HookRun {
                hook: hook.name().to_string(),
                result,
            });
        }
        runs
    }
}

/// Compresses scanned PDFs at a fixed level.
#[derive(Debug, Clone)]
pub struct CompressionHook {
    client: Arc<ScanClient>,
    level: CompressionLevel,
}

impl CompressionHook {
    pub fn new(client: Arc<ScanClient>, level: CompressionLevel) -> Self {
        Self { client, level }
    }
}

#[async_trait]
impl PostScanHook for CompressionHook {
    fn name(&self) -> &str {
        "compress"
    }

    async fn after_scan(&self, outcome: &ScanOutcome) -> Result<HookOutcome, HookError> {
        if self.level.is_off() {
            return Ok(HookOutcome::Skipped("no compression level selected".to_string()));
        }
        if !outcome.is_scanned_pdf() {
            return Ok(HookOutcome::Skipped(format!(
                "{} is not a scanned PDF",
                outcome.archivo
            )));
        }

        let request = CompressRequest {
            input_file: outcome.archivo.clone(),
            level: self.level,
            output_file: None,
        };
        let compressed = self.client.compress_pdf(&request).await?;
        Ok(HookOutcome::Compressed(compressed))
    }
}

/// Opens the scanned PDF in a preview window.
#[derive(Debug, Clone)]
pub struct PreviewHook {
    client: Arc<ScanClient>,
    launcher: PreviewLauncher,
}

impl PreviewHook {
    pub fn new(client: Arc<ScanClient>, launcher: PreviewLauncher) -> Self {
        Self { client, launcher }
    }
}

#[async_trait]
impl PostScanHook for PreviewHook {
    fn name(&self) -> &str {
        "preview"
    }

    async fn after_scan(&self, outcome: &ScanOutcome) -> Result<HookOutcome, HookError> {
        if !outcome.is_pdf() {
            return Ok(HookOutcome::Skipped(format!(
                "{} is not a PDF",
                outcome.archivo
            )));
        }
        let url = self.client.preview_url(&outcome.archivo)?;
        let window = self.launcher.open(url).await?;
        Ok(HookOutcome::PreviewOpened(window))
    }
}
