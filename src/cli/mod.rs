//! Command-line interface.

mod output;

use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::ScanClient;
use crate::config::{load_settings, Settings};
use crate::models::{BookRef, CompressionLevel, ProgressSnapshot, ScanKind, ScanRequest};
use crate::monitor::{ProgressMonitor, SnapshotCallback};
use crate::services::{
    handle_preview_message, CompressionHook, HookChain, PreviewHook, PreviewLauncher,
    PreviewMessage, ScanError, ScanService, ServiceCheck,
};

#[derive(Parser, Debug)]
#[command(name = "escaneo", version, about = "Drive a document scanning service from the terminal")]
pub struct Cli {
    /// Scanning service base URL
    #[arg(long, env = "ESCANEO_URL", global = true)]
    pub url: Option<String>,

    /// Do not draw the progress notification
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether the scanner service is available
    Check,
    /// Scan a document
    Scan(ScanArgs),
    /// Compress a scanned PDF
    Compress {
        /// File path as reported by the service
        file: String,
        #[arg(long, value_enum, default_value_t = CompressionLevel::Medium)]
        level: CompressionLevel,
    },
    /// Split a scanned document into one PDF per code
    Process {
        file: String,
        /// Detected code; repeat for each document
        #[arg(long = "code", required = true)]
        codes: Vec<String>,
        #[arg(long)]
        year: String,
        #[arg(long = "type")]
        book_type: String,
    },
    /// Follow the progress of a running task
    Watch {
        task_id: String,
    },
    /// Open the preview of a scanned file
    Preview {
        file: String,
        /// Read preview messages as JSON lines from stdin
        #[arg(long)]
        listen: bool,
    },
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[arg(long, value_enum, default_value_t = ScanKind::Single)]
    pub kind: ScanKind,
    #[arg(long, default_value_t = 300)]
    pub resolution: u32,
    #[arg(long, default_value = "Color")]
    pub mode: String,
    /// Scan both sides (feeder only)
    #[arg(long)]
    pub duplex: bool,
    /// Page limit (feeder only)
    #[arg(long, default_value_t = 100)]
    pub max_pages: u32,
    /// Book year, used for code detection
    #[arg(long)]
    pub year: Option<String>,
    /// Book type, used for code detection
    #[arg(long = "type")]
    pub book_type: Option<String>,
    /// Compress the scanned PDF afterwards
    #[arg(long, value_enum)]
    pub compress: Option<CompressionLevel>,
    /// Open a preview of the scanned PDF
    #[arg(long)]
    pub preview: bool,
}

impl ScanArgs {
    fn request(&self) -> ScanRequest {
        let mut request = ScanRequest {
            resolution: self.resolution,
            mode: self.mode.clone(),
            ..Default::default()
        };
        if self.kind.uses_feeder() {
            request = request.with_feeder(self.duplex, self.max_pages);
        }
        if let (Some(year), Some(book_type)) = (&self.year, &self.book_type) {
            request = request.with_book(BookRef::new(year, book_type));
        }
        request
    }
}

/// Run a parsed command line. `Ok(false)` means the command failed and
/// the failure was already shown.
pub async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut settings = load_settings().await;
    if let Some(url) = &cli.url {
        settings.base_url = url.clone();
    }
    debug!("Using scanning service at {}", settings.base_url);

    let draw = !cli.no_progress && console::Term::stderr().is_term();
    let client = Arc::new(settings.client()?);

    match cli.command {
        Commands::Check => {
            let mut service = ScanService::new(client);
            let check = service.verify_service().await;
            output::service_check(&check);
            Ok(matches!(check, ServiceCheck::Available { .. }))
        }
        Commands::Scan(args) => scan(&settings, client, draw, args).await,
        Commands::Compress { file, level } => {
            let service = ScanService::new(client);
            match service.compress(&file, level).await {
                Ok(outcome) => {
                    output::compression(&outcome);
                    Ok(true)
                }
                Err(e) => fail(&e),
            }
        }
        Commands::Process {
            file,
            codes,
            year,
            book_type,
        } => {
            let service = ScanService::new(client);
            match service
                .process(&file, codes, BookRef::new(year, book_type))
                .await
            {
                Ok(outcome) => {
                    output::process(&outcome);
                    Ok(true)
                }
                Err(e) => fail(&e),
            }
        }
        Commands::Watch { task_id } => watch(&settings, client, draw, &task_id).await,
        Commands::Preview { file, listen } => {
            let launcher = PreviewLauncher::system(settings.screen());
            let url = client.preview_url(&file)?;
            match launcher.open(url.clone()).await {
                Ok(window) => output::preview(&window),
                Err(e) => output::warning(&format!("{}. Open {} manually.", e, url)),
            }
            if listen {
                listen_for_messages().await?;
            }
            Ok(true)
        }
    }
}

async fn scan(
    settings: &Settings,
    client: Arc<ScanClient>,
    draw: bool,
    args: ScanArgs,
) -> anyhow::Result<bool> {
    let mut hooks = HookChain::new();
    let level = args.compress.unwrap_or(settings.compression);
    if !level.is_off() {
        hooks.push(CompressionHook::new(Arc::clone(&client), level));
    }
    if args.preview || settings.auto_preview {
        let launcher = PreviewLauncher::system(settings.screen());
        hooks.push(PreviewHook::new(Arc::clone(&client), launcher));
    }
    if hooks.is_empty() {
        debug!("No post-scan hooks configured");
    } else {
        debug!("{} post-scan hooks configured", hooks.len());
    }

    let monitor = ProgressMonitor::new(client.clone(), settings.monitor_settings(draw));
    let mut service = ScanService::new(client)
        .with_hooks(hooks)
        .with_monitor(monitor.clone());

    match service.verify_service().await {
        ServiceCheck::Available { .. } => {}
        check => {
            output::service_check(&check);
            return Ok(false);
        }
    }

    let result = service.scan(args.kind, args.request()).await;
    monitor.hide();
    match result {
        Ok(report) => {
            output::scan_report(&report, args.duplex);
            Ok(true)
        }
        Err(e) => fail(&e),
    }
}

async fn watch(
    settings: &Settings,
    client: Arc<ScanClient>,
    draw: bool,
    task_id: &str,
) -> anyhow::Result<bool> {
    let monitor = ProgressMonitor::new(client, settings.monitor_settings(draw));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let on_complete: SnapshotCallback = Arc::new(move |snapshot: &ProgressSnapshot| {
        let _ = tx.send(snapshot.clone());
    });
    monitor.start_monitoring(task_id, None, Some(on_complete))?;

    tokio::select! {
        finished = rx.recv() => {
            monitor.hide();
            match finished {
                Some(snapshot) => {
                    output::task_finished(task_id, &snapshot);
                    Ok(snapshot.status.is_success())
                }
                None => Ok(false),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            monitor.hide();
            output::warning(&format!("Stopped watching {}", task_id));
            Ok(false)
        }
    }
}

async fn listen_for_messages() -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match PreviewMessage::parse(&line) {
            Ok(message) => handle_preview_message(&message),
            Err(e) => warn!("Ignoring malformed preview message: {}", e),
        }
    }
    Ok(())
}

fn fail(error: &ScanError) -> anyhow::Result<bool> {
    output::failure(&error.to_string());
    Ok(false)
}
