use std::path::Path;

use crate::error::{Result, UploadError};

/// Per-file ceiling: 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// One file taken from an upload request, held until the whole batch has
/// been validated.
#[derive(Debug, Clone)]
pub struct UploadedFileDescriptor {
    pub original_name: String,
    /// Lowercased extension without the dot; empty when the name has none.
    pub extension: String,
    pub content_type: String,
    pub size: u64,
    pub data: Vec<u8>,
}

impl UploadedFileDescriptor {
    /// `size` is the number of bytes the client sent, which can exceed
    /// `data.len()` when the reader stopped early on an oversized part.
    pub fn new(original_name: &str, content_type: &str, data: Vec<u8>, size: u64) -> Self {
        UploadedFileDescriptor {
            original_name: original_name.to_string(),
            extension: extension_of(original_name),
            content_type: content_type.to_string(),
            size,
            data,
        }
    }

    #[cfg(test)]
    pub fn from_bytes(original_name: &str, content_type: &str, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self::new(original_name, content_type, data, size)
    }
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn is_allowed_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim().to_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
}

/// Checks extension, declared content type and size. Both type signals must
/// agree with the allowlist.
pub fn validate(file: &UploadedFileDescriptor) -> Result<()> {
    let ext_ok = ALLOWED_EXTENSIONS.contains(&file.extension.as_str());
    if !ext_ok || !is_allowed_content_type(&file.content_type) {
        return Err(UploadError::UnsupportedType);
    }
    if file.size > MAX_FILE_SIZE {
        return Err(UploadError::TooLarge);
    }
    Ok(())
}

/// Content type served for a stored file, keyed on its extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    match extension_of(file_name).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(name: &str, content_type: &str, size: u64) -> UploadedFileDescriptor {
        UploadedFileDescriptor::new(name, content_type, Vec::new(), size)
    }

    #[test]
    fn test_accepts_allowlisted_images() {
        assert!(validate(&sized("a.jpg", "image/jpeg", 10)).is_ok());
        assert!(validate(&sized("a.JPEG", "image/jpg", 10)).is_ok());
        assert!(validate(&sized("a.Png", "IMAGE/PNG", 10)).is_ok());
        assert!(validate(&sized("a.webp", "image/webp; charset=binary", 10)).is_ok());
    }

    #[test]
    fn test_extension_alone_is_not_trusted() {
        assert!(matches!(
            validate(&sized("a.png", "text/html", 10)),
            Err(UploadError::UnsupportedType)
        ));
    }

    #[test]
    fn test_content_type_alone_is_not_trusted() {
        assert!(matches!(
            validate(&sized("a.gif", "image/png", 10)),
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            validate(&sized("png", "image/png", 10)),
            Err(UploadError::UnsupportedType)
        ));
    }

    #[test]
    fn test_size_boundary() {
        assert!(validate(&sized("a.png", "image/png", MAX_FILE_SIZE)).is_ok());
        assert!(matches!(
            validate(&sized("a.png", "image/png", MAX_FILE_SIZE + 1)),
            Err(UploadError::TooLarge)
        ));
    }

    #[test]
    fn test_extension_is_lowercased() {
        let file = UploadedFileDescriptor::from_bytes("Holiday.JPG", "image/jpeg", vec![1, 2, 3]);
        assert_eq!(file.extension, "jpg");
        assert_eq!(file.size, 3);
    }

    #[test]
    fn test_content_type_for_stored_files() {
        assert_eq!(content_type_for("x.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("x.webp"), "image/webp");
        assert_eq!(content_type_for("x.bin"), "application/octet-stream");
    }
}
