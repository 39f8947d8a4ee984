//! Typed requests against the `/escaneo` endpoints.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::ClientError;
use crate::models::{
    ApiReply, CompressOutcome, CompressRequest, ProcessOutcome, ProcessRequest, ProgressSnapshot,
    ScanKind, ScanOutcome, ScanRequest, ServiceStatus,
};

pub const USER_AGENT: &str = concat!("escaneo/", env!("CARGO_PKG_VERSION"));

const CHECK_SERVICE_PATH: &str = "escaneo/check_service";
const PROGRESS_PATH: &str = "escaneo/progress";
const COMPRESS_PATH: &str = "escaneo/compress_pdf";
const PROCESS_PATH: &str = "escaneo/procesar";
const PREVIEW_PATH: &str = "escaneo/preview";

/// Client for the scanning service.
#[derive(Debug, Clone)]
pub struct ScanClient {
    client: Client,
    base_url: Url,
}

impl ScanClient {
    /// Create a new client with the default user agent.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Self::with_user_agent(base_url, timeout, None)
    }

    /// Create a new client with a custom user agent.
    pub fn with_user_agent(
        base_url: &str,
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(user_agent.unwrap_or(USER_AGENT))
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            client,
            base_url: normalize_base(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Ask the backend whether the local scanner service is reachable.
    pub async fn check_service(&self) -> Result<ServiceStatus, ClientError> {
        let url = self.endpoint(CHECK_SERVICE_PATH)?;
        self.get_json(url).await
    }

    /// Fetch the current progress snapshot of a task.
    pub async fn progress(&self, task_id: &str) -> Result<ProgressSnapshot, ClientError> {
        if is_dot_segment(task_id) {
            return Err(ClientError::InvalidTaskId(task_id.to_string()));
        }
        let url = self.endpoint(&format!(
            "{}/{}",
            PROGRESS_PATH,
            urlencoding::encode(task_id)
        ))?;
        self.get_json(url).await
    }

    /// Run a scan on the endpoint matching `kind`.
    pub async fn scan(
        &self,
        kind: ScanKind,
        request: &ScanRequest,
    ) -> Result<ScanOutcome, ClientError> {
        self.post_action(kind.endpoint().trim_start_matches('/'), request)
            .await
    }

    pub async fn scan_with_ocr(&self, request: &ScanRequest) -> Result<ScanOutcome, ClientError> {
        self.scan(ScanKind::Ocr, request).await
    }

    pub async fn scan_multiple(&self, request: &ScanRequest) -> Result<ScanOutcome, ClientError> {
        self.scan(ScanKind::Multiple, request).await
    }

    pub async fn scan_multiple_with_ocr(
        &self,
        request: &ScanRequest,
    ) -> Result<ScanOutcome, ClientError> {
        self.scan(ScanKind::MultipleOcr, request).await
    }

    pub async fn compress_pdf(
        &self,
        request: &CompressRequest,
    ) -> Result<CompressOutcome, ClientError> {
        self.post_action(COMPRESS_PATH, request).await
    }

    /// Split a scanned document into one PDF per detected code.
    pub async fn procesar(&self, request: &ProcessRequest) -> Result<ProcessOutcome, ClientError> {
        self.post_action(PROCESS_PATH, request).await
    }

    /// URL of the preview page for a scanned file. Only the file name is sent.
    pub fn preview_url(&self, archivo: &str) -> Result<Url, ClientError> {
        let name = file_name(archivo);
        self.endpoint(&format!("{}/{}", PREVIEW_PATH, urlencoding::encode(name)))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }

        resp.json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// POST to an action endpoint and unwrap the `{success, error, ...}` envelope.
    /// The body is decoded whatever the HTTP status, since failures carry their
    /// message in it.
    async fn post_action<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        let resp = self.client.post(url).json(body).send().await?;

        let status = resp.status();
        let text = resp.text().await?;

        match serde_json::from_str::<ApiReply<T>>(&text) {
            Ok(reply) => reply.into_result().map_err(ClientError::Rejected),
            Err(e) if status.is_success() => Err(ClientError::Parse(e.to_string())),
            Err(_) => Err(ClientError::Api {
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}

/// Last path segment of a file path, accepting either separator.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Whether `segment` is a relative path segment that URL resolution removes.
pub fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

/// Ensure the base URL ends in `/` so relative endpoint joins keep any path prefix.
fn normalize_base(base_url: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(base_url.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
