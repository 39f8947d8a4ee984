//! escaneo - terminal client for a document scanning service.
//!
//! Talks to the scanning service's `/escaneo` HTTP endpoints: checks
//! availability, runs flatbed and feeder scans (optionally with OCR code
//! detection), compresses and splits the resulting PDFs, and follows long
//! running tasks through the [`monitor::ProgressMonitor`].

pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod monitor;
pub mod services;

pub use client::{ClientError, ScanClient};
pub use monitor::{MonitorSettings, ProgressMonitor};
pub use services::{ScanService, ServiceCheck};
