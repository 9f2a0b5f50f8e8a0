use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::Cache;
use crate::config::Settings;
use crate::error::UploadError;
use crate::paths::StorageRoot;
use crate::sanitize::{sanitize_file, sanitize_folder};
use crate::static_files::{serve_static_file, STATIC_CACHE_CONTROL};
use crate::storage::StorageGateway;
use crate::upload::{public_url, UploadCoordinator, UploadRequest};
use crate::util::{request_base_url, run_blocking};
use crate::validator::{UploadedFileDescriptor, MAX_FILE_SIZE};

/// Multipart field that carries the images.
pub const FILE_FIELD: &str = "images[]";
/// Multipart field that carries the target folder.
pub const FOLDER_FIELD: &str = "folder";

/// Shared, read-only state handed to every handler.
pub struct AppState {
    pub storage: StorageGateway,
    pub coordinator: UploadCoordinator,
    pub cache: Cache,
    pub base_url: Option<String>,
}

impl AppState {
    pub fn new(root: StorageRoot, base_url: Option<String>, cache_entries: usize) -> Self {
        let storage = StorageGateway::new(root);
        AppState {
            coordinator: UploadCoordinator::new(storage.clone()),
            storage,
            cache: Cache::new(cache_entries),
            base_url,
        }
    }

    fn base_url(&self, headers: &HeaderMap) -> String {
        request_base_url(self.base_url.as_deref(), headers)
    }
}

type ApiResult = std::result::Result<Json<Value>, UploadError>;

/// Builds the router with every endpoint, CORS and request tracing.
pub fn build_router(state: Arc<AppState>, max_request_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/folders", get(list_folders))
        .route("/folders/{folder}/files", get(list_files))
        .route("/folders/{folder}/files/{filename}", delete(delete_file))
        .route("/uploads/{*path}", get(serve_upload))
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Opens the uploads directory, binds the listening address and serves until
/// Ctrl-C.
pub async fn run_server(settings: Settings) -> Result<()> {
    let root = StorageRoot::open(&settings.storage_root)
        .with_context(|| format!("Failed to open storage root {}", settings.storage_root))?;
    tracing::info!("Storage root: {}", root.path().display());

    let state = Arc::new(AppState::new(
        root,
        settings.base_url.clone(),
        settings.static_cache_entries,
    ));
    let router = build_router(state, settings.max_request_bytes);

    let listener = TcpListener::bind(&settings.address)
        .await
        .with_context(|| format!("Failed to bind to address {}", settings.address))?;
    tracing::info!("Upload server listening on: {}", settings.address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

async fn health() -> impl IntoResponse {
    Json(json!({ "success": true, "message": "Upload server is running" }))
}

async fn not_found(uri: Uri) -> UploadError {
    UploadError::NotFound(format!("Not Found - {}", uri))
}

fn multipart_error(err: MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge
    } else {
        UploadError::MalformedRequest(err.body_text())
    }
}

/// Reads the multipart body into an [`UploadRequest`]. The folder field may
/// come before or after the files. Reading a file part stops as soon as it
/// passes the size ceiling; its true size is still reported.
async fn read_upload(mut multipart: Multipart) -> std::result::Result<UploadRequest, UploadError> {
    let mut request = UploadRequest::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FOLDER_FIELD {
            request.folder = Some(field.text().await.map_err(multipart_error)?);
            continue;
        }

        let Some(original_name) = field.file_name().map(str::to_string) else {
            tracing::debug!("Ignoring form field {:?}", name);
            continue;
        };
        if name != FILE_FIELD {
            return Err(UploadError::UnexpectedField(name));
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let mut data = Vec::new();
        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len() as u64;
            if size > MAX_FILE_SIZE {
                data = Vec::new();
                break;
            }
            data.extend_from_slice(&chunk);
        }

        request
            .files
            .push(UploadedFileDescriptor::new(&original_name, &content_type, data, size));
    }

    Ok(request)
}

async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let multipart = multipart.map_err(|e| UploadError::MalformedRequest(e.body_text()))?;
    let request = read_upload(multipart).await?;
    let base = state.base_url(&headers);

    let coordinator = state.coordinator.clone();
    let outcome = run_blocking(move || coordinator.run(request, &base)).await?;

    Ok(Json(json!({
        "success": true,
        "folder": outcome.folder,
        "files": outcome.files,
    })))
}

async fn list_folders(State(state): State<Arc<AppState>>) -> ApiResult {
    let storage = state.storage.clone();
    let folders = run_blocking(move || storage.list_folders()).await?;
    Ok(Json(json!({ "success": true, "folders": folders })))
}

async fn list_files(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(folder): Path<String>,
) -> ApiResult {
    let folder = sanitize_folder(&folder).ok_or(UploadError::InvalidFolder)?;

    let storage = state.storage.clone();
    let target = folder.clone();
    let files = run_blocking(move || storage.list_files(&target)).await?;

    let base = state.base_url(&headers);
    let urls: Vec<String> = files.iter().map(|file| public_url(&base, &folder, file)).collect();
    Ok(Json(json!({ "success": true, "folder": folder, "files": urls })))
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path((folder, filename)): Path<(String, String)>,
) -> ApiResult {
    let folder = sanitize_folder(&folder).ok_or(UploadError::InvalidFolder)?;
    let file = sanitize_file(&filename).ok_or(UploadError::InvalidFileName)?;

    let storage = state.storage.clone();
    let (f, n) = (folder.clone(), file.clone());
    run_blocking(move || storage.delete(&f, &n)).await?;
    state.cache.invalidate(&folder, &file);

    Ok(Json(json!({
        "success": true,
        "message": "File deleted successfully.",
        "folder": folder,
        "filename": file,
    })))
}

async fn serve_upload(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    match serve_static_file(&state.storage, &state.cache, uri.path()).await {
        Ok((data, mime)) => (
            [
                (CONTENT_TYPE, mime),
                (CACHE_CONTROL, STATIC_CACHE_CONTROL),
                (X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            data.to_vec(),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
