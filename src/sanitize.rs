use serde::Serialize;
use std::fmt;

/// A folder name that is safe to join under the uploads directory.
/// Only `[A-Za-z0-9_-]`, never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FolderName(String);

/// A file name that is safe to join under a folder.
/// Only `[A-Za-z0-9._-]`, never empty, never containing `..`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FileName(String);

impl FolderName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FileName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_folder_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_file_char(c: char) -> bool {
    is_folder_char(c) || c == '.'
}

/// Trims `raw` and checks it against the allowlist and traversal patterns.
fn sanitize_with(raw: &str, allowed: fn(char) -> bool) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(allowed) {
        return None;
    }
    // Separators can't pass the allowlist, but the traversal guard must not
    // depend on it.
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return None;
    }
    Some(trimmed.to_string())
}

/// Validates a requested folder name. Returns `None` when it is unsafe.
pub fn sanitize_folder(raw: &str) -> Option<FolderName> {
    sanitize_with(raw, is_folder_char).map(FolderName)
}

/// Validates a requested file name. Returns `None` when it is unsafe.
pub fn sanitize_file(raw: &str) -> Option<FileName> {
    sanitize_with(raw, is_file_char).map(FileName)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accepts_plain_folder() {
        let folder = sanitize_folder("my-folder_1").unwrap();
        assert_eq!(folder.as_str(), "my-folder_1");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(sanitize_folder("  album1\n").unwrap().as_str(), "album1");
        assert_eq!(sanitize_file(" photo.png ").unwrap().as_str(), "photo.png");
    }

    #[test]
    fn test_rejects_empty_and_blank() {
        assert!(sanitize_folder("").is_none());
        assert!(sanitize_folder("   ").is_none());
        assert!(sanitize_file("\t").is_none());
    }

    #[test]
    fn test_rejects_folder_traversal() {
        assert!(sanitize_folder("../etc").is_none());
        assert!(sanitize_folder("..").is_none());
        assert!(sanitize_folder("a/b").is_none());
        assert!(sanitize_folder("a\\b").is_none());
    }

    #[test]
    fn test_folder_disallows_dots_and_spaces() {
        assert!(sanitize_folder("photos.old").is_none());
        assert!(sanitize_folder("my photos").is_none());
        assert!(sanitize_folder("fotos-é").is_none());
    }

    #[test]
    fn test_file_allows_single_dots() {
        assert!(sanitize_file("3f2a.webp").is_some());
        assert!(sanitize_file(".hidden").is_some());
        assert!(sanitize_file("a..png").is_none());
        assert!(sanitize_file("..").is_none());
    }

    proptest! {
        #[test]
        fn separators_and_parent_refs_always_rejected(
            prefix in "[A-Za-z0-9._-]{0,8}",
            bad in prop_oneof![Just("/"), Just("\\"), Just("..")],
            suffix in "[A-Za-z0-9._-]{0,8}",
        ) {
            let raw = format!("{}{}{}", prefix, bad, suffix);
            prop_assert!(sanitize_folder(&raw).is_none());
            prop_assert!(sanitize_file(&raw).is_none());
        }

        #[test]
        fn allowlisted_folder_names_round_trip(raw in "[A-Za-z0-9_-]{1,32}") {
            let folder = sanitize_folder(&raw).unwrap();
            prop_assert_eq!(folder.as_str(), raw.as_str());
        }
    }
}
