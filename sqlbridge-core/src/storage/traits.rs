//! The persistent-storage seam.

use super::StorageResult;

/// Byte-level storage for serialized database images, keyed by name.
///
/// The host provider reads an image when a database is opened and the
/// dispatcher writes it back when a changed database is closed. Writes must
/// be atomic: a reader sees either the old image or the new one, never a mix.
pub trait ImageStore: Send + Sync {
    /// Reads the image stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails for any reason other than absence.
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Atomically replaces the image stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Deletes the image stored under `name`. Deleting a missing image is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error for I/O failures.
    fn delete(&self, name: &str) -> StorageResult<()>;

    /// Checks if an image exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.read(name)?.is_some())
    }
}
