//! Scan workflow: availability gate, progress monitoring, and post-scan hooks.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::hooks::{HookChain, HookRun};
use super::state::AppState;
use crate::client::{ClientError, ScanClient};
use crate::models::{
    BookRef, CompressOutcome, CompressRequest, CompressionLevel, ProcessOutcome, ProcessRequest,
    ProgressSnapshot, ScanKind, ScanOutcome, ScanRequest,
};
use crate::monitor::{ProgressMonitor, SnapshotCallback};

/// Poll periods to wait for the final snapshot after a monitored scan returns.
const COMPLETION_GRACE_POLLS: u32 = 4;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scanner service is not available. Start the scanner service and check again.")]
    ServiceUnavailable,

    #[error("Year and book type are required to detect codes")]
    MissingBookRef,

    #[error("Select a compression level")]
    NoCompressionLevel,

    #[error("At least one code is required")]
    NoCodes,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Outcome of an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCheck {
    Available { os: Option<String> },
    Unavailable,
    Error(String),
}

/// A finished scan and what its hooks did.
#[derive(Debug)]
pub struct ScanReport {
    pub kind: ScanKind,
    pub outcome: ScanOutcome,
    /// Progress task the scan was monitored under, if any.
    pub task_id: Option<String>,
    pub hooks: Vec<HookRun>,
}

/// Drives scans against one service.
#[derive(Debug)]
pub struct ScanService {
    client: Arc<ScanClient>,
    state: AppState,
    hooks: HookChain,
    monitor: Option<ProgressMonitor>,
}

impl ScanService {
    pub fn new(client: Arc<ScanClient>) -> Self {
        Self {
            client,
            state: AppState::default(),
            hooks: HookChain::new(),
            monitor: None,
        }
    }

    pub fn with_hooks(mut self, hooks: HookChain) -> Self {
        self.hooks = hooks;
        self
    }

    /// Monitor feeder scans with `monitor`.
    pub fn with_monitor(mut self, monitor: ProgressMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn monitor(&self) -> Option<&ProgressMonitor> {
        self.monitor.as_ref()
    }

    /// Refresh service availability. Any failure leaves the service marked unavailable.
    pub async fn verify_service(&mut self) -> ServiceCheck {
        match self.client.check_service().await {
            Ok(status) if status.available => {
                info!("Scanner service available (os: {:?})", status.os);
                self.state.service_available = true;
                self.state.os = status.os.clone();
                ServiceCheck::Available { os: status.os }
            }
            Ok(_) => {
                warn!("Scanner service reported unavailable");
                self.state.mark_unavailable();
                ServiceCheck::Unavailable
            }
            Err(e) => {
                warn!("Failed to check scanner service: {}", e);
                self.state.mark_unavailable();
                ServiceCheck::Error(e.to_string())
            }
        }
    }

    /// Run a scan, then the post-scan hooks.
    ///
    /// Feeder scans are monitored when a monitor is attached; the request is
    /// tagged with a fresh task id unless it already carries one.
    pub async fn scan(
        &mut self,
        kind: ScanKind,
        mut request: ScanRequest,
    ) -> Result<ScanReport, ScanError> {
        if !self.state.service_available {
            return Err(ScanError::ServiceUnavailable);
        }
        if kind.runs_ocr()
            && kind.uses_feeder()
            && !request.book.as_ref().is_some_and(BookRef::is_complete)
        {
            return Err(ScanError::MissingBookRef);
        }

        let session = match &self.monitor {
            Some(monitor) if kind.uses_feeder() => {
                let task_id = request.task_id.clone().unwrap_or_else(new_task_id);
                request.task_id = Some(task_id.clone());
                MonitorSession::start(monitor, task_id)
            }
            _ => None,
        };

        info!(%kind, "Starting scan");
        let result = self.client.scan(kind, &request).await;

        let task_id = match session {
            Some(session) => Some(session.settle().await),
            None => None,
        };

        let outcome = result?;
        info!("Scan finished: {}", outcome.archivo);
        self.state.record_scan(&outcome);

        let hooks = self.hooks.run(&outcome).await;
        Ok(ScanReport {
            kind,
            outcome,
            task_id,
            hooks,
        })
    }

    /// Compress a PDF already on the service.
    pub async fn compress(
        &self,
        file: &str,
        level: CompressionLevel,
    ) -> Result<CompressOutcome, ScanError> {
        if level.is_off() {
            return Err(ScanError::NoCompressionLevel);
        }
        let request = CompressRequest {
            input_file: file.to_string(),
            level,
            output_file: None,
        };
        info!("Compressing {} ({})", file, level);
        Ok(self.client.compress_pdf(&request).await?)
    }

    /// Split a scanned document into one PDF per code.
    pub async fn process(
        &self,
        file: &str,
        codes: Vec<String>,
        book: BookRef,
    ) -> Result<ProcessOutcome, ScanError> {
        if codes.is_empty() {
            return Err(ScanError::NoCodes);
        }
        if !book.is_complete() {
            return Err(ScanError::MissingBookRef);
        }
        let request = ProcessRequest {
            archivo: file.to_string(),
            codigos: codes,
            book,
        };
        info!(
            "Processing {} into {} documents",
            file,
            request.codigos.len()
        );
        Ok(self.client.procesar(&request).await?)
    }
}

/// A monitoring session tied to one in-flight scan.
struct MonitorSession<'a> {
    monitor: &'a ProgressMonitor,
    task_id: String,
    generation: u64,
    finished: Arc<Notify>,
}

impl<'a> MonitorSession<'a> {
    fn start(monitor: &'a ProgressMonitor, task_id: String) -> Option<Self> {
        let finished = Arc::new(Notify::new());
        let signal = Arc::clone(&finished);
        let on_complete: SnapshotCallback = Arc::new(move |snapshot: &ProgressSnapshot| {
            debug!(status = %snapshot.status, "Monitored scan reached terminal state");
            signal.notify_one();
        });

        match monitor.start_monitoring(&task_id, None, Some(on_complete)) {
            Ok(generation) => Some(Self {
                monitor,
                task_id,
                generation,
                finished,
            }),
            Err(e) => {
                warn!("Scanning without progress monitoring: {}", e);
                None
            }
        }
    }

    /// Give the monitor a few polls to observe completion, then stop it.
    async fn settle(self) -> String {
        let grace = self.monitor.settings().poll_interval * COMPLETION_GRACE_POLLS;
        if tokio::time::timeout(grace, self.finished.notified())
            .await
            .is_err()
        {
            debug!(task_id = %self.task_id, "No final progress snapshot before grace period ended");
        }
        if self.monitor.generation() == self.generation {
            self.monitor.stop_monitoring();
        }
        self.task_id
    }
}

fn new_task_id() -> String {
    format!("scan_{}", chrono::Utc::now().timestamp_millis())
}
