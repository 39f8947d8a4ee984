//! Integration tests for the scan workflow: availability gate, hook chain,
//! and monitored feeder scans.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use escaneo::client::ScanClient;
use escaneo::models::{BookRef, CompressionLevel, ScanKind, ScanOutcome, ScanRequest};
use escaneo::monitor::{BarPalette, MonitorSettings, ProgressMonitor};
use escaneo::services::{
    CompressionHook, HookChain, HookError, HookOutcome, PostScanHook, ScanError, ScanService,
    ServiceCheck,
};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records the order hooks ran in.
struct RecordingHook {
    name: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PostScanHook for RecordingHook {
    fn name(&self) -> &str {
        self.name
    }

    async fn after_scan(&self, outcome: &ScanOutcome) -> Result<HookOutcome, HookError> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, outcome.archivo));
        Ok(HookOutcome::Skipped("recorded".to_string()))
    }
}

async fn mount_available(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/escaneo/check_service"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "available": true,
            "data": {"os": "Linux"}
        })))
        .mount(server)
        .await;
}

async fn mount_scan(server: &MockServer, endpoint: &str, archivo: &str, delay: Duration) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "success": true,
                    "archivo": archivo,
                    "mensaje": "Escaneo completado",
                    "num_paginas": 3
                }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> Arc<ScanClient> {
    Arc::new(ScanClient::new(&server.uri(), Duration::from_secs(5)).expect("Failed to build client"))
}

fn fast_monitor(client: Arc<ScanClient>) -> ProgressMonitor {
    ProgressMonitor::new(
        client,
        MonitorSettings {
            poll_interval: Duration::from_millis(20),
            auto_hide_after: Duration::from_secs(5),
            draw: false,
        },
    )
}

#[tokio::test]
async fn test_unavailable_service_blocks_scan() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/escaneo/check_service"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"available": false})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/escaneo/scan"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut service = ScanService::new(client(&server));
    assert_eq!(service.verify_service().await, ServiceCheck::Unavailable);

    let err = service
        .scan(ScanKind::Single, ScanRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::ServiceUnavailable));
}

#[tokio::test]
async fn test_hooks_run_in_order_after_scan() {
    let server = MockServer::start().await;
    mount_available(&server).await;
    mount_scan(&server, "/escaneo/scan", "scanned/scan_1.pdf", Duration::ZERO).await;
    Mock::given(method("POST"))
        .and(path("/escaneo/compress_pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "output_file": "scanned/scan_1_compressed.pdf",
            "reduction_percent": 40.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hooks = HookChain::new()
        .with(RecordingHook {
            name: "first",
            seen: Arc::clone(&seen),
        })
        .with(CompressionHook::new(Arc::clone(&client), CompressionLevel::Medium))
        .with(RecordingHook {
            name: "last",
            seen: Arc::clone(&seen),
        });

    assert_eq!(hooks.len(), 3);

    let mut service = ScanService::new(client).with_hooks(hooks);
    service.verify_service().await;
    let report = service
        .scan(ScanKind::Single, ScanRequest::default())
        .await
        .unwrap();

    let names: Vec<&str> = report.hooks.iter().map(|run| run.hook.as_str()).collect();
    assert_eq!(names, vec!["first", "compress", "last"]);
    assert!(matches!(
        report.hooks[1].result,
        Ok(HookOutcome::Compressed(ref c)) if c.output_file == "scanned/scan_1_compressed.pdf"
    ));
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["first:scanned/scan_1.pdf", "last:scanned/scan_1.pdf"]
    );
    assert_eq!(
        service.state().current_file.as_deref(),
        Some("scanned/scan_1.pdf")
    );
    assert_eq!(service.state().os.as_deref(), Some("Linux"));
}

#[tokio::test]
async fn test_compression_skips_non_pdf() {
    let server = MockServer::start().await;
    mount_available(&server).await;
    mount_scan(&server, "/escaneo/scan", "scanned/scan_1.tiff", Duration::ZERO).await;
    Mock::given(method("POST"))
        .and(path("/escaneo/compress_pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let hooks = HookChain::new().with(CompressionHook::new(
        Arc::clone(&client),
        CompressionLevel::High,
    ));
    let mut service = ScanService::new(client).with_hooks(hooks);
    service.verify_service().await;

    let report = service
        .scan(ScanKind::Single, ScanRequest::default())
        .await
        .unwrap();
    assert!(matches!(report.hooks[0].result, Ok(HookOutcome::Skipped(_))));
}

#[tokio::test]
async fn test_failing_hook_does_not_fail_scan() {
    let server = MockServer::start().await;
    mount_available(&server).await;
    mount_scan(&server, "/escaneo/scan", "scanned/scan_1.pdf", Duration::ZERO).await;
    Mock::given(method("POST"))
        .and(path("/escaneo/compress_pdf"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "error": "Ghostscript no está instalado"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hooks = HookChain::new()
        .with(CompressionHook::new(Arc::clone(&client), CompressionLevel::Low))
        .with(RecordingHook {
            name: "after",
            seen: Arc::clone(&seen),
        });
    let mut service = ScanService::new(client).with_hooks(hooks);
    service.verify_service().await;

    let report = service
        .scan(ScanKind::Single, ScanRequest::default())
        .await
        .unwrap();
    let err = report.hooks[0].result.as_ref().unwrap_err();
    assert_eq!(err.to_string(), "Ghostscript no está instalado");
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_monitored_feeder_scan() {
    let server = MockServer::start().await;
    mount_available(&server).await;
    mount_scan(
        &server,
        "/escaneo/scan_multiple",
        "scanned/scan_1.pdf",
        Duration::from_millis(200),
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/escaneo/progress/scan_\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "percent": 100,
            "description": "Escaneo finalizado",
            "messages": [{"message": "3 páginas escaneadas"}]
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let monitor = fast_monitor(Arc::clone(&client));
    let mut service = ScanService::new(client).with_monitor(monitor.clone());
    service.verify_service().await;

    let request = ScanRequest::default().with_feeder(false, 10);
    let report = service.scan(ScanKind::Multiple, request).await.unwrap();

    let task_id = report.task_id.expect("feeder scan should be monitored");
    assert!(task_id.starts_with("scan_"));

    let requests = server.received_requests().await.unwrap();
    let scan_request = requests
        .iter()
        .find(|r| r.url.path() == "/escaneo/scan_multiple")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&scan_request.body).unwrap();
    assert_eq!(body["task_id"], json!(task_id));
    assert!(requests
        .iter()
        .any(|r| r.url.path() == format!("/escaneo/progress/{task_id}")));

    assert!(!monitor.is_polling());
    let view = monitor.notification().unwrap();
    assert!(view.visible);
    assert_eq!(view.palette, BarPalette::Success);
}

#[tokio::test]
async fn test_monitor_stopped_when_task_never_finishes() {
    let server = MockServer::start().await;
    mount_available(&server).await;
    mount_scan(
        &server,
        "/escaneo/scan_multiple_with_ocr",
        "scanned/scan_1.pdf",
        Duration::from_millis(60),
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/escaneo/progress/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "running",
            "percent": 50,
            "description": "Procesando OCR"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let monitor = fast_monitor(Arc::clone(&client));
    let mut service = ScanService::new(client).with_monitor(monitor.clone());
    service.verify_service().await;

    let request = ScanRequest::default()
        .with_feeder(true, 5)
        .with_book(BookRef::new("2024", "Protocolo"))
        .with_task_id("scan_42");
    let report = service
        .scan(ScanKind::MultipleOcr, request)
        .await
        .unwrap();

    assert_eq!(report.task_id.as_deref(), Some("scan_42"));
    assert!(!monitor.is_polling());
    assert_eq!(monitor.active_task_id(), None);
}

#[tokio::test]
async fn test_flatbed_scan_is_not_monitored() {
    let server = MockServer::start().await;
    mount_available(&server).await;
    mount_scan(&server, "/escaneo/scan_with_ocr", "scanned/scan_1.pdf", Duration::ZERO).await;

    let client = client(&server);
    let monitor = fast_monitor(Arc::clone(&client));
    let mut service = ScanService::new(client).with_monitor(monitor.clone());
    service.verify_service().await;

    let report = service
        .scan(ScanKind::Ocr, ScanRequest::default())
        .await
        .unwrap();
    assert!(report.task_id.is_none());
    assert!(monitor.notification().is_none());
}
