use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, UploadError};

/// Absolute location of the uploads directory. Fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot(PathBuf);

impl StorageRoot {
    /// Creates the directory if needed and pins its canonical path.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        Ok(StorageRoot(path.canonicalize()?))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Lexical normalization: drops `.` and lets `..` pop, without touching disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves `name` under `root` and proves the result is `root` itself or
/// one of its descendants.
pub fn resolve(root: &Path, name: &str) -> Result<PathBuf> {
    let target = normalize(&root.join(name));
    if target.starts_with(root) {
        Ok(target)
    } else {
        tracing::warn!("Blocked path escape: {:?} under {}", name, root.display());
        Err(UploadError::InvalidPath)
    }
}

/// Like [`resolve`], but the result must sit strictly inside `parent`.
/// Used for file-within-folder lookups.
pub fn resolve_child(parent: &Path, name: &str) -> Result<PathBuf> {
    let target = resolve(parent, name)?;
    if target == parent {
        return Err(UploadError::InvalidPath);
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::{sanitize_file, sanitize_folder};
    use proptest::prelude::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/uploads")
    }

    #[test]
    fn test_resolves_plain_folder() {
        let path = resolve(&root(), "album1").unwrap();
        assert_eq!(path, PathBuf::from("/srv/uploads/album1"));
    }

    #[test]
    fn test_rejects_parent_escape() {
        assert!(matches!(resolve(&root(), "../etc"), Err(UploadError::InvalidPath)));
        assert!(matches!(resolve(&root(), "a/../../b"), Err(UploadError::InvalidPath)));
    }

    #[test]
    fn test_rejects_absolute_override() {
        assert!(resolve(&root(), "/etc/passwd").is_err());
    }

    #[test]
    fn test_sibling_with_shared_prefix_is_outside() {
        // "/srv/uploads-old" starts with the same bytes but is not inside.
        assert!(resolve(&root(), "../uploads-old").is_err());
    }

    #[test]
    fn test_root_itself_is_contained() {
        assert_eq!(resolve(&root(), ".").unwrap(), root());
    }

    #[test]
    fn test_child_must_be_strictly_inside() {
        let folder = root().join("album1");
        assert!(matches!(resolve_child(&folder, "."), Err(UploadError::InvalidPath)));
        assert_eq!(
            resolve_child(&folder, "a.png").unwrap(),
            PathBuf::from("/srv/uploads/album1/a.png")
        );
    }

    #[test]
    fn test_open_creates_and_canonicalizes() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageRoot::open(tmp.path().join("nested").join("uploads")).unwrap();
        assert!(storage.path().is_absolute());
        assert!(storage.path().is_dir());
    }

    proptest! {
        #[test]
        fn sanitized_names_stay_inside_root(folder in "[A-Za-z0-9_-]{1,24}", file in "[A-Za-z0-9._-]{1,24}") {
            let root = root();
            if let Some(folder) = sanitize_folder(&folder) {
                let dir = resolve(&root, folder.as_str()).unwrap();
                prop_assert!(dir.starts_with(&root) && dir != root);
                if let Some(file) = sanitize_file(&file) {
                    if let Ok(path) = resolve_child(&dir, file.as_str()) {
                        prop_assert!(path.starts_with(&dir) && path != dir);
                    }
                }
            }
        }
    }
}
