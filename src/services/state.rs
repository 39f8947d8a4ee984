//! Session state shared by the scan workflow.

use crate::models::ScanOutcome;

/// What the client knows about the service and the last scan.
///
/// Kept for library callers; the command line prints scan results directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// Result of the last availability check. Scans are refused while false.
    pub service_available: bool,
    /// Operating system reported by the service, cleared when it goes away.
    pub os: Option<String>,
    /// File produced by the last successful scan.
    pub current_file: Option<String>,
    /// Codes detected by the last successful scan.
    pub current_codes: Vec<String>,
}

impl AppState {
    pub fn record_scan(&mut self, outcome: &ScanOutcome) {
        self.current_file = Some(outcome.archivo.clone());
        self.current_codes = outcome.codigos.clone();
    }

    pub fn mark_unavailable(&mut self) {
        self.service_available = false;
        self.os = None;
    }
}
