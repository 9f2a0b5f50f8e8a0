use dashmap::DashMap;
use std::sync::Arc;

use crate::sanitize::{FileName, FolderName};

/// Bytes of recently served uploads, keyed by `folder/file`.
#[derive(Clone)]
pub struct Cache {
    files: Arc<DashMap<String, Arc<Vec<u8>>>>,
    capacity: usize,
}

fn key(folder: &FolderName, file: &FileName) -> String {
    format!("{}/{}", folder, file)
}

impl Cache {
    pub fn new(capacity: usize) -> Self {
        Cache {
            files: Arc::new(DashMap::new()),
            capacity,
        }
    }

    pub fn get(&self, folder: &FolderName, file: &FileName) -> Option<Arc<Vec<u8>>> {
        self.files.get(&key(folder, file)).map(|v| Arc::clone(v.value()))
    }

    /// Inserts unless the cache is full. Entries are never evicted, only
    /// invalidated.
    pub fn set(&self, folder: &FolderName, file: &FileName, data: Arc<Vec<u8>>) {
        if self.files.len() >= self.capacity {
            return;
        }
        self.files.insert(key(folder, file), data);
    }

    pub fn invalidate(&self, folder: &FolderName, file: &FileName) {
        self.files.remove(&key(folder, file));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}
