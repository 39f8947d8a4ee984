//! Wire and domain types for the scanning service.

mod progress;
mod scan;
mod service;

pub use progress::{clamp_percent, LogEntry, ProgressSnapshot, TaskStatus};
pub use scan::{
    ApiReply, BookRef, CompressOutcome, CompressRequest, CompressionLevel, ProcessOutcome,
    ProcessRequest, ScanKind, ScanOutcome, ScanRequest,
};
pub use service::ServiceStatus;
