use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use serde_json::Value;

use super::Disk;
use crate::config::AppConfig;
use crate::error::{DiskError, Result};

/// Disk factory trait / 磁盘工厂 trait
pub trait DiskFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// Build a disk from its fully-resolved options / 创建磁盘实例
    fn create_disk(&self, name: &str, config: Value) -> Result<Arc<dyn Disk>>;
}

/// Named disks and the factories that build them / 磁盘管理器
///
/// Owned by the caller; nothing here is process-global.
#[derive(Clone, Default)]
pub struct DiskManager {
    disks: Arc<RwLock<HashMap<String, Arc<dyn Disk>>>>,
    factories: Arc<RwLock<HashMap<String, Arc<dyn DiskFactory>>>>,
    default_disk: Arc<RwLock<Option<String>>>,
}

impl DiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every disk listed in the application config / 根据应用配置创建全部磁盘
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let manager = Self::new();
        crate::register_storage_drivers(&manager).await;

        for (name, disk) in &config.disks {
            let options = disk.resolved_options(&config.timezone);
            manager.create_disk(name, &disk.driver, options).await?;
        }
        if !config.default.is_empty() {
            manager.set_default(&config.default).await?;
        }
        Ok(manager)
    }

    /// Register disk factory / 注册磁盘工厂
    pub async fn register_factory(&self, factory: Arc<dyn DiskFactory>) {
        let driver_type = factory.driver_type().to_string();
        self.factories.write().await.insert(driver_type.clone(), factory);
        tracing::info!("Disk factory registered: {}", driver_type);
    }

    /// Create and store a named disk / 创建磁盘实例
    pub async fn create_disk(&self, name: &str, driver_type: &str, config: Value) -> Result<Arc<dyn Disk>> {
        let factory = self
            .factories
            .read()
            .await
            .get(driver_type)
            .cloned()
            .ok_or_else(|| DiskError::Config {
                disk: name.to_string(),
                reason: format!("unknown driver type {}", driver_type),
            })?;

        match factory.create_disk(name, config) {
            Ok(disk) => {
                self.disks.write().await.insert(name.to_string(), disk.clone());
                tracing::info!("Disk created: {} ({})", name, driver_type);
                Ok(disk)
            }
            Err(e) => {
                tracing::error!("Disk creation failed: {} ({}) - {}", name, driver_type, e);
                Err(e)
            }
        }
    }

    /// Get disk instance / 获取磁盘实例
    pub async fn disk(&self, name: &str) -> Option<Arc<dyn Disk>> {
        self.disks.read().await.get(name).cloned()
    }

    /// Choose the disk returned by `default_disk` / 设置默认磁盘
    pub async fn set_default(&self, name: &str) -> Result<()> {
        if !self.disks.read().await.contains_key(name) {
            return Err(DiskError::Config {
                disk: name.to_string(),
                reason: "default disk is not configured".to_string(),
            });
        }
        *self.default_disk.write().await = Some(name.to_string());
        Ok(())
    }

    pub async fn default_disk(&self) -> Option<Arc<dyn Disk>> {
        let name = self.default_disk.read().await.clone()?;
        self.disk(&name).await
    }

    /// Remove disk instance / 移除磁盘实例
    pub async fn remove_disk(&self, name: &str) -> Option<Arc<dyn Disk>> {
        let removed = self.disks.write().await.remove(name);
        if removed.is_some() {
            tracing::info!("Disk removed: {}", name);
        }
        removed
    }

    /// List all disks / 列出所有磁盘
    pub async fn list_disks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.disks.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all available driver types / 列出所有可用的驱动类型
    pub async fn list_driver_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.read().await.keys().cloned().collect();
        types.sort();
        types
    }
}
