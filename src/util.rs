use axum::http::header::HOST;
use axum::http::HeaderMap;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{Result, UploadError};

const FALLBACK_BASE: &str = "http://localhost";

/// Base address for public file URLs: the configured override when present,
/// otherwise `http://{Host}` of the current request.
pub fn request_base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = configured {
        return base.strip_suffix('/').unwrap_or(base).to_string();
    }

    let host = headers.get(HOST).and_then(|value| value.to_str().ok());
    match host.and_then(|host| Url::parse(&format!("http://{}", host)).ok()) {
        Some(url) if url.path() == "/" && url.host_str().is_some() => url.origin().ascii_serialization(),
        _ => FALLBACK_BASE.to_string(),
    }
}

/// Percent-decodes a raw request path and splits it into its non-empty
/// segments. Traversal checks happen on the decoded segments.
pub fn decode_path_segments(path: &str) -> Vec<String> {
    percent_decode_str(path)
        .decode_utf8_lossy()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs a filesystem operation on tokio's blocking pool.
pub async fn run_blocking<T, F>(op: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| UploadError::Storage(std::io::Error::other(e)))?
}
