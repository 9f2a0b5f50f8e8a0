use std::sync::Arc;

use crate::cache::Cache;
use crate::error::{Result, UploadError};
use crate::sanitize::{sanitize_file, sanitize_folder};
use crate::storage::StorageGateway;
use crate::upload::PUBLIC_PREFIX;
use crate::util::{decode_path_segments, run_blocking};
use crate::validator::content_type_for;

/// Cache-Control header value for served uploads (1 hour).
pub const STATIC_CACHE_CONTROL: &str = "public, max-age=3600";

/// Serves one stored upload. `request_path` is the raw, still
/// percent-encoded request path, e.g. `/uploads/album1/3f2a.png`.
pub async fn serve_static_file(
    storage: &StorageGateway,
    cache: &Cache,
    request_path: &str,
) -> Result<(Arc<Vec<u8>>, &'static str)> {
    let rest = request_path.strip_prefix(PUBLIC_PREFIX).unwrap_or(request_path);
    let segments = decode_path_segments(rest);
    let [folder, file] = segments.as_slice() else {
        return Err(UploadError::file_not_found());
    };

    let folder = sanitize_folder(folder).ok_or(UploadError::InvalidFolder)?;
    let file = sanitize_file(file).ok_or(UploadError::InvalidFileName)?;
    let mime = content_type_for(file.as_str());

    // A hit is only trusted while the file is still on disk.
    if let Some(data) = cache.get(&folder, &file) {
        let storage = storage.clone();
        let (f, n) = (folder.clone(), file.clone());
        if run_blocking(move || Ok(storage.contains(&f, &n))).await? {
            return Ok((data, mime));
        }
        cache.invalidate(&folder, &file);
        return Err(UploadError::file_not_found());
    }

    let reader = storage.clone();
    let (f, n) = (folder.clone(), file.clone());
    let data = run_blocking(move || reader.read(&f, &n)).await?;

    let data = Arc::new(data);
    cache.set(&folder, &file, Arc::clone(&data));
    tracing::debug!("Serving {}/{} ({} cached files)", folder, file, cache.len());
    Ok((data, mime))
}
