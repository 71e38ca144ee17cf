//! S3驱动工厂

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::config::S3Config;
use super::driver::S3Driver;
use crate::error::{DiskError, Result};
use crate::storage::{Disk, DiskFactory, MemoryStore};

fn parse_config(name: &str, config: Value) -> Result<S3Config> {
    serde_json::from_value(config).map_err(|e| DiskError::Config {
        disk: name.to_string(),
        reason: format!("配置解析失败: {}", e),
    })
}

/// S3驱动工厂
pub struct S3DriverFactory;

impl DiskFactory for S3DriverFactory {
    fn driver_type(&self) -> &'static str {
        "s3"
    }

    fn create_disk(&self, name: &str, config: Value) -> Result<Arc<dyn Disk>> {
        let config = parse_config(name, config)?;
        Ok(Arc::new(S3Driver::new(name, &config, CancellationToken::new())?))
    }
}

/// In-process bucket with the same directory semantics / 内存存储桶驱动工厂
///
/// 只需要 `bucket` 和 `url`，用于本地开发与测试。
pub struct MemoryDriverFactory;

impl DiskFactory for MemoryDriverFactory {
    fn driver_type(&self) -> &'static str {
        "memory"
    }

    fn create_disk(&self, name: &str, config: Value) -> Result<Arc<dyn Disk>> {
        let config = parse_config(name, config)?;
        if config.bucket.trim().is_empty() {
            return Err(DiskError::Config {
                disk: name.to_string(),
                reason: "missing bucket".to_string(),
            });
        }
        let store = Arc::new(MemoryStore::new(&config.bucket));
        Ok(Arc::new(S3Driver::with_store(
            name,
            &config,
            store,
            CancellationToken::new(),
        )))
    }
}
