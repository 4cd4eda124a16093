//! Directory-backed image store.
//!
//! Each storage name maps to a file under a root directory. Writes go to a
//! hidden temporary file in the same directory, are synced, then renamed over
//! the target so a crash never leaves a partial image behind.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use super::{ImageStore, StorageError, StorageResult};

fn io_error(context: impl Into<String>, source: std::io::Error) -> StorageError {
    StorageError::Io {
        context: context.into(),
        source,
    }
}

/// Image store rooted at a directory on the host file system.
#[derive(Debug, Clone)]
pub struct DirImageStore {
    root: PathBuf,
}

impl DirImageStore {
    /// Creates a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            io_error(format!("failed to create image directory '{}'", root.display()), e)
        })?;
        Ok(Self { root })
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a storage name to a path under the root.
    ///
    /// Leading `/` is ignored so sandbox-style absolute names land under the
    /// root; `..` and empty names are rejected.
    fn image_path(&self, name: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(name.trim_start_matches('/'));
        let mut path = self.root.clone();
        let mut parts = 0;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    parts += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::InvalidName(name.to_string()));
                }
            }
        }
        if parts == 0 {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(path)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{file}.tmp"))
}

impl ImageStore for DirImageStore {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.image_path(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(format!("failed to read image '{}'", path.display()), e)),
        }
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.image_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                io_error(format!("failed to create directory '{}'", parent.display()), e)
            })?;
        }
        let tmp = temp_path(&path);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| io_error(format!("failed to create '{}'", tmp.display()), e))?;
        file.write_all(bytes)
            .map_err(|e| io_error(format!("failed to write '{}'", tmp.display()), e))?;
        file.sync_all()
            .map_err(|e| io_error(format!("failed to sync '{}'", tmp.display()), e))?;
        drop(file);
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            io_error(format!("failed to replace image '{}'", path.display()), e)
        })
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.image_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(format!("failed to delete image '{}'", path.display()), e)),
        }
    }
}
