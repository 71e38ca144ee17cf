pub mod config;
pub mod error;
pub mod storage;
pub mod utils;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use drivers::s3::{DirectoryMarkers, S3Config, S3Driver};
pub use error::{DiskError, Result, StoreError};
pub use storage::{Disk, DiskManager, LocalFile, ObjectStore, SourceFile};

// Register all storage drivers (call unified registration function from drivers module) / 注册所有存储驱动
pub async fn register_storage_drivers(manager: &storage::DiskManager) {
    drivers::register_all(manager).await
}
