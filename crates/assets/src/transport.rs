//! # Transport - Byte Retrieval Behind Every Tier
//!
//! A transport turns a location (URL, `file://` URI or plain path) into
//! bytes. Responses carry an optional error string next to whatever bytes
//! arrived, because the bundle manager distinguishes "error with partial
//! data" from "error with nothing".
//!
//! - [`HttpTransport`]: reqwest for http(s), tokio fs for everything else
//! - [`MemoryTransport`]: in-process map, records every request

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::debug;

/// Progress callback, called with a fraction in `0.0..=1.0`
pub type ProgressFn<'a> = dyn Fn(f32) + Send + Sync + 'a;

/// Result of a transport fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    /// Bytes received, possibly partial when `error` is set
    pub bytes: Vec<u8>,
    /// Transport error string, `None` on success
    pub error: Option<String>,
}

impl TransportResponse {
    pub fn ok(bytes: Vec<u8>) -> Self {
        Self { bytes, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { bytes: Vec::new(), error: Some(error.into()) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Source of bytes for the fetch pipeline
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch everything at `location`, reporting progress if asked
    async fn fetch(&self, location: &str, progress: Option<&ProgressFn<'_>>) -> TransportResponse;

    /// Load-based existence check: absence shows up as an error
    async fn exists(&self, location: &str) -> bool {
        self.fetch(location, None).await.is_ok()
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Local path for a `file://` URI or plain path. URIs may carry a relative
/// root (`file://./StreamingAssets/...`), so they are decoded by hand.
fn local_path(location: &str) -> Option<PathBuf> {
    match location.strip_prefix("file://") {
        Some(rest) => urlencoding::decode(rest).ok().map(|p| PathBuf::from(p.into_owned())),
        None => Some(PathBuf::from(location)),
    }
}

/// reqwest-backed transport with local file fallback
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_remote(
        &self,
        url: &str,
        progress: Option<&ProgressFn<'_>>,
    ) -> TransportResponse {
        let mut response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return TransportResponse::failed(e.to_string()),
        };

        if !response.status().is_success() {
            return TransportResponse::failed(format!("HTTP {}", response.status()));
        }

        let total = response.content_length().filter(|len| *len > 0);
        let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    bytes.extend_from_slice(&chunk);
                    if let (Some(report), Some(total)) = (progress, total) {
                        report((bytes.len() as f32 / total as f32).min(1.0));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    return TransportResponse { bytes, error: Some(e.to_string()) };
                }
            }
        }

        if let Some(report) = progress {
            report(1.0);
        }
        TransportResponse::ok(bytes)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, location: &str, progress: Option<&ProgressFn<'_>>) -> TransportResponse {
        if is_remote(location) {
            return self.fetch_remote(location, progress).await;
        }

        let Some(path) = local_path(location) else {
            return TransportResponse::failed(format!("unsupported location: {}", location));
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                if let Some(report) = progress {
                    report(1.0);
                }
                TransportResponse::ok(bytes)
            }
            Err(e) => {
                debug!(path = %path.display(), "local read failed: {}", e);
                TransportResponse::failed(e.to_string())
            }
        }
    }

    async fn exists(&self, location: &str) -> bool {
        if is_remote(location) {
            return match self.client.head(location).send().await {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            };
        }
        match local_path(location) {
            Some(path) => tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false),
            None => false,
        }
    }
}

/// What a [`MemoryTransport`] answers for a location
#[derive(Debug, Clone)]
enum MemoryEntry {
    Bytes(Vec<u8>),
    Error { partial: Vec<u8>, error: String },
    /// Never completes
    Stall,
}

/// In-process transport keyed by exact location string.
///
/// Unknown locations fail with `404 Not Found`. Every fetch and existence
/// check is recorded in order, so callers can assert which locations a
/// request touched.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    entries: DashMap<String, MemoryEntry>,
    requests: Mutex<Vec<String>>,
    /// Number of progress steps reported per successful fetch
    progress_steps: usize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self { progress_steps: 4, ..Default::default() }
    }

    pub fn insert(&self, location: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(location.into(), MemoryEntry::Bytes(bytes.into()));
    }

    /// Answer `location` with an error and optional partial bytes
    pub fn fail(
        &self,
        location: impl Into<String>,
        partial: impl Into<Vec<u8>>,
        error: impl Into<String>,
    ) {
        self.entries.insert(
            location.into(),
            MemoryEntry::Error { partial: partial.into(), error: error.into() },
        );
    }

    /// Make `location` hang forever
    pub fn stall(&self, location: impl Into<String>) {
        self.entries.insert(location.into(), MemoryEntry::Stall);
    }

    pub fn remove(&self, location: &str) {
        self.entries.remove(location);
    }

    /// Every location requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn lookup(&self, location: &str) -> Option<MemoryEntry> {
        self.requests.lock().push(location.to_string());
        self.entries.get(location).map(|e| e.value().clone())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, location: &str, progress: Option<&ProgressFn<'_>>) -> TransportResponse {
        match self.lookup(location) {
            Some(MemoryEntry::Bytes(bytes)) => {
                if let Some(report) = progress {
                    let steps = self.progress_steps.max(1);
                    for step in 1..=steps {
                        report(step as f32 / steps as f32);
                        tokio::task::yield_now().await;
                    }
                }
                TransportResponse::ok(bytes)
            }
            Some(MemoryEntry::Error { partial, error }) => {
                TransportResponse { bytes: partial, error: Some(error) }
            }
            Some(MemoryEntry::Stall) => std::future::pending().await,
            None => TransportResponse::failed("404 Not Found"),
        }
    }

    async fn exists(&self, location: &str) -> bool {
        match self.lookup(location) {
            Some(MemoryEntry::Bytes(_)) => true,
            Some(MemoryEntry::Stall) => std::future::pending().await,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_transport_records_requests() {
        let transport = MemoryTransport::new();
        transport.insert("https://cdn/a.txt", b"hello".to_vec());

        let hit = transport.fetch("https://cdn/a.txt", None).await;
        let miss = transport.fetch("https://cdn/b.txt", None).await;

        assert_eq!(hit, TransportResponse::ok(b"hello".to_vec()));
        assert!(!miss.is_ok());
        assert!(miss.bytes.is_empty());
        assert_eq!(transport.requests(), vec!["https://cdn/a.txt", "https://cdn/b.txt"]);
    }

    #[tokio::test]
    async fn test_memory_transport_progress_is_monotonic() {
        let transport = MemoryTransport::new();
        transport.insert("bundle", vec![1, 2, 3]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let report = move |p: f32| sink.lock().push(p);

        transport.fetch("bundle", Some(&report)).await;

        let seen = seen.lock().clone();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[tokio::test]
    async fn test_http_transport_reads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("intro file.txt");
        std::fs::write(&file, b"welcome").unwrap();

        let transport = HttpTransport::new("test").unwrap();
        let plain = transport.fetch(file.to_str().unwrap(), None).await;
        assert_eq!(plain.bytes, b"welcome");

        let uri = reqwest::Url::from_file_path(&file).unwrap().to_string();
        assert!(uri.contains("%20"));
        let escaped = transport.fetch(&uri, None).await;
        assert_eq!(escaped.bytes, b"welcome");

        assert!(transport.exists(file.to_str().unwrap()).await);
        assert!(!transport.exists(dir.path().join("missing").to_str().unwrap()).await);
    }
}
