//! Persistent storage for database images.
//!
//! The sandbox cannot reach the host file system, so databases travel as
//! whole serialized images. An [`ImageStore`] holds those images by name.

mod dir;
mod error;
mod memory;
mod traits;

pub use dir::DirImageStore;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryImageStore;
pub use traits::ImageStore;
