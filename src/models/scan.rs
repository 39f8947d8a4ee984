//! Request and reply bodies for the scan, compress and process endpoints.

use serde::{Deserialize, Serialize};

/// Which scan endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScanKind {
    /// Single page from the flatbed.
    Single,
    /// Single page followed by OCR code detection.
    Ocr,
    /// Multiple pages from the document feeder (ADF).
    Multiple,
    /// Multiple pages from the feeder followed by OCR code detection.
    MultipleOcr,
}

impl ScanKind {
    /// Endpoint path relative to the service base URL.
    pub fn endpoint(self) -> &'static str {
        match self {
            ScanKind::Single => "/escaneo/scan",
            ScanKind::Ocr => "/escaneo/scan_with_ocr",
            ScanKind::Multiple => "/escaneo/scan_multiple",
            ScanKind::MultipleOcr => "/escaneo/scan_multiple_with_ocr",
        }
    }

    pub fn uses_feeder(self) -> bool {
        matches!(self, ScanKind::Multiple | ScanKind::MultipleOcr)
    }

    pub fn runs_ocr(self) -> bool {
        matches!(self, ScanKind::Ocr | ScanKind::MultipleOcr)
    }
}

impl std::fmt::Display for ScanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ScanKind::Single => "single",
            ScanKind::Ocr => "ocr",
            ScanKind::Multiple => "multiple",
            ScanKind::MultipleOcr => "multiple-ocr",
        };
        f.write_str(label)
    }
}

/// Year and type of the notarial book a scan belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookRef {
    #[serde(rename = "año")]
    pub year: String,
    #[serde(rename = "tipo")]
    pub book_type: String,
}

impl BookRef {
    pub fn new(year: impl Into<String>, book_type: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            book_type: book_type.into(),
        }
    }

    /// Both fields must be filled in for OCR code lookup.
    pub fn is_complete(&self) -> bool {
        !self.year.trim().is_empty() && !self.book_type.trim().is_empty()
    }
}

/// Scan parameters. Feeder and book fields are omitted from the body when unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRequest {
    pub resolution: u32,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplex: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
    #[serde(flatten)]
    pub book: Option<BookRef>,
    /// Correlates the scan with a progress task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            resolution: 300,
            mode: "Color".to_string(),
            duplex: None,
            max_pages: None,
            book: None,
            task_id: None,
        }
    }
}

impl ScanRequest {
    pub fn with_feeder(mut self, duplex: bool, max_pages: u32) -> Self {
        self.duplex = Some(duplex);
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_book(mut self, book: BookRef) -> Self {
        self.book = Some(book);
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

/// Envelope shared by every action endpoint.
///
/// A missing `success` flag counts as failure: the backend's catch-all error
/// handler replies with only `{"error": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiReply<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> ApiReply<T> {
    /// Split into the body or the backend's error text.
    pub fn into_result(self) -> Result<T, String> {
        if self.success {
            Ok(self.body)
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "unknown error reported by scanning service".to_string()))
        }
    }
}

/// Result of any scan endpoint. OCR and feeder fields are absent for plain scans.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanOutcome {
    pub archivo: String,
    pub mensaje: String,
    pub codigos: Vec<String>,
    pub total_codigos: u32,
    pub caracteres_extraidos: Option<u64>,
    pub num_paginas: Option<u32>,
    pub ocr_available: Option<bool>,
    pub ocr_error: Option<String>,
}

impl ScanOutcome {
    pub fn is_pdf(&self) -> bool {
        self.archivo.to_ascii_lowercase().ends_with(".pdf")
    }

    /// Whether the file lives in the service's `scanned/` output directory.
    pub fn is_scanned_pdf(&self) -> bool {
        self.is_pdf() && self.archivo.replace('\\', "/").contains("scanned/")
    }
}

/// Compression strength. `Off` never reaches the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    #[value(name = "none")]
    #[serde(rename = "none")]
    #[default]
    Off,
    Low,
    Medium,
    High,
    Maximum,
}

impl CompressionLevel {
    pub fn is_off(self) -> bool {
        self == CompressionLevel::Off
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompressionLevel::Off => "none",
            CompressionLevel::Low => "low",
            CompressionLevel::Medium => "medium",
            CompressionLevel::High => "high",
            CompressionLevel::Maximum => "maximum",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "" => Some(CompressionLevel::Off),
            "low" => Some(CompressionLevel::Low),
            "medium" => Some(CompressionLevel::Medium),
            "high" => Some(CompressionLevel::High),
            "maximum" | "max" => Some(CompressionLevel::Maximum),
            _ => None,
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressRequest {
    pub input_file: String,
    pub level: CompressionLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompressOutcome {
    pub mensaje: String,
    pub original_size_mb: f64,
    pub compressed_size_mb: f64,
    pub reduction_mb: f64,
    pub reduction_percent: f64,
    pub output_file: String,
    pub level: String,
}

/// Split a scanned document into per-code PDFs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRequest {
    pub archivo: String,
    pub codigos: Vec<String>,
    #[serde(flatten)]
    pub book: BookRef,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessOutcome {
    pub mensaje: String,
    pub archivos_generados: u32,
    pub ruta_salida: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scan_request_body_omits_unset_fields() {
        let body = serde_json::to_value(ScanRequest::default()).unwrap();
        assert_eq!(body, json!({"resolution": 300, "mode": "Color"}));
    }

    #[test]
    fn test_scan_request_body_with_book_and_feeder() {
        let request = ScanRequest::default()
            .with_feeder(true, 20)
            .with_book(BookRef::new("2023", "protocolo"))
            .with_task_id("scan_1");
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["duplex"], json!(true));
        assert_eq!(body["max_pages"], json!(20));
        assert_eq!(body["año"], json!("2023"));
        assert_eq!(body["tipo"], json!("protocolo"));
        assert_eq!(body["task_id"], json!("scan_1"));
    }

    #[test]
    fn test_reply_success() {
        let reply: ApiReply<ScanOutcome> = serde_json::from_value(json!({
            "success": true,
            "archivo": "scanned/scan_20240101_100000.pdf",
            "mensaje": "Documento escaneado. 2 códigos detectados.",
            "codigos": ["A-1", "A-2"],
            "total_codigos": 2,
            "caracteres_extraidos": 1834
        }))
        .unwrap();
        let outcome = reply.into_result().unwrap();
        assert_eq!(outcome.codigos, vec!["A-1", "A-2"]);
        assert!(outcome.is_scanned_pdf());
        assert_eq!(outcome.caracteres_extraidos, Some(1834));
    }

    #[test]
    fn test_reply_failure_keeps_error_verbatim() {
        let reply: ApiReply<ScanOutcome> = serde_json::from_value(json!({
            "success": false,
            "error": "No se pudieron escanear páginas"
        }))
        .unwrap();
        assert_eq!(reply.into_result().unwrap_err(), "No se pudieron escanear páginas");
    }

    #[test]
    fn test_reply_without_success_flag_is_failure() {
        let reply: ApiReply<CompressOutcome> =
            serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert_eq!(reply.into_result().unwrap_err(), "boom");
    }

    #[test]
    fn test_tiff_fallback_is_not_pdf() {
        let outcome = ScanOutcome {
            archivo: "scanned/scan_20240101_100000.tiff".to_string(),
            ..Default::default()
        };
        assert!(!outcome.is_pdf());
        assert!(!outcome.is_scanned_pdf());
    }

    #[test]
    fn test_compression_level_parse() {
        assert_eq!(CompressionLevel::parse("none"), Some(CompressionLevel::Off));
        assert_eq!(CompressionLevel::parse("High"), Some(CompressionLevel::High));
        assert_eq!(CompressionLevel::parse("max"), Some(CompressionLevel::Maximum));
        assert_eq!(CompressionLevel::parse("ultra"), None);
        assert_eq!(
            serde_json::to_value(CompressionLevel::Medium).unwrap(),
            json!("medium")
        );
    }

    #[test]
    fn test_process_request_body() {
        let request = ProcessRequest {
            archivo: "scanned/a.pdf".to_string(),
            codigos: vec!["X1".to_string()],
            book: BookRef::new("2022", "minutario"),
        };
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(
            body,
            json!({"archivo": "scanned/a.pdf", "codigos": ["X1"], "año": "2022", "tipo": "minutario"})
        );
    }
}
