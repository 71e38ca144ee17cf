// Driver package / 驱动包
pub mod s3;

use std::sync::Arc;

use crate::storage::DiskManager;

/// Register all drivers to DiskManager / 注册所有驱动
pub async fn register_all(manager: &DiskManager) {
    // Register S3 driver / 注册S3对象存储驱动
    manager.register_factory(Arc::new(s3::S3DriverFactory)).await;
    // Register in-memory bucket driver / 注册内存存储桶驱动
    manager.register_factory(Arc::new(s3::MemoryDriverFactory)).await;
}
