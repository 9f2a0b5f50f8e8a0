use crate::error::{Result, UploadError};
use crate::sanitize::{sanitize_folder, FileName, FolderName};
use crate::storage::StorageGateway;
use crate::validator::{validate, UploadedFileDescriptor};

/// Public path prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Raw input of one upload: the requested folder and the attached files in
/// the order the client sent them.
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub folder: Option<String>,
    pub files: Vec<UploadedFileDescriptor>,
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub folder: FolderName,
    pub files: Vec<String>,
}

/// Builds `{base}/uploads/{folder}/{name}`, dropping one trailing slash from
/// `base`.
pub fn public_url(base: &str, folder: &FolderName, name: &FileName) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    format!("{}{}/{}/{}", base, PUBLIC_PREFIX, folder, name)
}

#[derive(Debug, Clone)]
pub struct UploadCoordinator {
    storage: StorageGateway,
}

impl UploadCoordinator {
    pub fn new(storage: StorageGateway) -> Self {
        UploadCoordinator { storage }
    }

    /// Runs one upload to completion. The batch is all-or-nothing: every file
    /// is validated before the first byte is written.
    pub fn run(&self, request: UploadRequest, base: &str) -> Result<UploadOutcome> {
        let folder = request
            .folder
            .as_deref()
            .and_then(sanitize_folder)
            .ok_or(UploadError::InvalidFolder)?;

        self.storage.ensure_folder(&folder)?;

        if request.files.is_empty() {
            return Err(UploadError::NoFiles);
        }

        for (index, file) in request.files.iter().enumerate() {
            if let Err(e) = validate(file) {
                tracing::warn!(
                    "Rejected upload batch for {}: file #{} ({}) failed: {}",
                    folder,
                    index + 1,
                    file.original_name,
                    e
                );
                return Err(e);
            }
        }

        let mut urls = Vec::with_capacity(request.files.len());
        for file in &request.files {
            let name = self.storage.store(&folder, file)?;
            urls.push(public_url(base, &folder, &name));
        }

        tracing::info!("Uploaded {} file(s) to {}", urls.len(), folder);
        Ok(UploadOutcome { folder, files: urls })
    }
}
