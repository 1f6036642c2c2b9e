pub mod storage;

pub use storage::{StorageConfig, StorageError, StorageManager, StoredFile};
