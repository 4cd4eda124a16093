use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{ImageStore, StorageError, StorageResult};

fn poisoned<T>(err: PoisonError<T>) -> StorageError {
    StorageError::Poisoned(err.to_string())
}

/// Image store held entirely in memory. Contents are lost with the value.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryImageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.read().map_or(0, |images| images.len())
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all stored images, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .images
            .read()
            .map(|images| images.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl ImageStore for MemoryImageStore {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.images.read().map_err(poisoned)?.get(name).cloned())
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        self.images
            .write()
            .map_err(poisoned)?
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        self.images.write().map_err(poisoned)?.remove(name);
        Ok(())
    }

    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.images.read().map_err(poisoned)?.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_delete() {
        let store = MemoryImageStore::new();
        assert_eq!(store.read("a.db").expect("read"), None);
        store.write_atomic("a.db", b"image").expect("write");
        assert_eq!(store.read("a.db").expect("read").as_deref(), Some(&b"image"[..]));
        assert!(store.exists("a.db").expect("exists"));
        assert_eq!(store.names(), vec!["a.db".to_string()]);
        store.delete("a.db").expect("delete");
        store.delete("a.db").expect("delete missing");
        assert!(store.is_empty());
    }
}
