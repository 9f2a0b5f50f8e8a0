use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Result, UploadError};
use crate::paths::{resolve, resolve_child, StorageRoot};
use crate::sanitize::{sanitize_file, sanitize_folder, FileName, FolderName};
use crate::validator::{validate, UploadedFileDescriptor};

/// All filesystem access for the uploads directory goes through here.
/// Every path is re-resolved against its parent before it is touched.
#[derive(Debug, Clone)]
pub struct StorageGateway {
    root: StorageRoot,
}

impl StorageGateway {
    pub fn new(root: StorageRoot) -> Self {
        StorageGateway { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    fn folder_path(&self, folder: &FolderName) -> Result<PathBuf> {
        resolve(self.root(), folder.as_str())
    }

    /// Resolves a folder that must already exist as a directory.
    fn existing_folder(&self, folder: &FolderName) -> Result<PathBuf> {
        let dir = self.folder_path(folder)?;
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(UploadError::folder_not_found()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(UploadError::folder_not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves a regular file inside an existing folder.
    fn existing_file(&self, folder: &FolderName, file: &FileName) -> Result<PathBuf> {
        let dir = self.existing_folder(folder)?;
        let path = resolve_child(&dir, file.as_str())?;
        // symlink_metadata: links are never treated as stored files.
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(UploadError::file_not_found()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(UploadError::file_not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates the folder (and parents). Succeeds when it already exists.
    pub fn ensure_folder(&self, folder: &FolderName) -> Result<PathBuf> {
        let dir = self.folder_path(folder)?;
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Writes one validated file under a fresh random name and returns that
    /// name. The client's file name only contributes its extension.
    pub fn store(&self, folder: &FolderName, file: &UploadedFileDescriptor) -> Result<FileName> {
        validate(file)?;
        let dir = self.existing_folder(folder)?;
        let name = generate_name(&file.extension)?;
        let path = resolve_child(&dir, name.as_str())?;

        let mut out = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let written = out.write_all(&file.data);
        drop(out);
        if let Err(e) = written {
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }

        tracing::info!(
            "Stored {} ({} bytes) as {}/{}",
            file.original_name,
            file.size,
            folder,
            name
        );
        Ok(name)
    }

    /// Immediate subdirectories of the root, byte-wise sorted. A root that
    /// does not exist yet lists as empty.
    pub fn list_folders(&self) -> Result<Vec<FolderName>> {
        let entries = match fs::read_dir(self.root()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut folders = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            // Names outside the allowlist can't be addressed by any request.
            if let Some(folder) = entry.file_name().to_str().and_then(sanitize_folder) {
                folders.push(folder);
            }
        }
        folders.sort();
        Ok(folders)
    }

    /// Regular files inside `folder`, byte-wise sorted.
    pub fn list_files(&self, folder: &FolderName) -> Result<Vec<FileName>> {
        let dir = self.existing_folder(folder)?;

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(file) = entry.file_name().to_str().and_then(sanitize_file) {
                files.push(file);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Removes exactly one regular file. Never recurses, never removes
    /// directories.
    pub fn delete(&self, folder: &FolderName, file: &FileName) -> Result<()> {
        let path = self.existing_file(folder, file)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Deleted {}/{}", folder, file);
                Ok(())
            }
            // Lost a race with another delete.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(UploadError::file_not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `file` is currently a regular file inside `folder`.
    pub fn contains(&self, folder: &FolderName, file: &FileName) -> bool {
        self.existing_file(folder, file).is_ok()
    }

    /// Reads one stored file.
    pub fn read(&self, folder: &FolderName, file: &FileName) -> Result<Vec<u8>> {
        let path = self.existing_file(folder, file)?;
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(UploadError::file_not_found()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `{uuid-v4}.{ext}`: 122 random bits keep collisions negligible.
fn generate_name(extension: &str) -> Result<FileName> {
    let raw = if extension.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{}.{}", Uuid::new_v4(), extension)
    };
    sanitize_file(&raw).ok_or(UploadError::InvalidFileName)
}
