//! Service layer for the scanning workflow.
//!
//! This module contains the scan workflow separated from terminal concerns,
//! so the CLI and tests drive the same code.

pub mod hooks;
pub mod preview;
pub mod scan;
pub mod state;

pub use hooks::{
    CompressionHook, HookChain, HookError, HookOutcome, HookRun, PostScanHook, PreviewHook,
};
pub use preview::{
    handle_preview_message, Opener, PreviewError, PreviewLauncher, PreviewMessage, PreviewWindow,
    ScreenSize, SystemOpener, PREVIEW_HEIGHT, PREVIEW_WIDTH,
};
pub use scan::{ScanError, ScanReport, ScanService, ServiceCheck};
pub use state::AppState;
