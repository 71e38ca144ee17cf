//! Application configuration module / 应用配置模块
//!
//! Disks are declared in `config.json` under `disks`, keyed by disk name.
//! Creates a default config file on first run / 首次运行时创建默认配置文件

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Timezone used for timestamps, e.g. `UTC`, `Asia/Shanghai` / 时间戳所用时区
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Name of the default disk / 默认磁盘名称
    #[serde(default)]
    pub default: String,
    /// Named disks / 磁盘配置
    #[serde(default)]
    pub disks: BTreeMap<String, DiskEntry>,
}

/// One disk entry: driver type plus driver options / 单个磁盘配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskEntry {
    pub driver: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            default: String::new(),
            disks: BTreeMap::new(),
        }
    }
}

impl DiskEntry {
    /// Driver options with the application timezone filled in / 补全时区后的驱动配置
    pub fn resolved_options(&self, app_timezone: &str) -> Value {
        let mut options = self.options.clone();
        let has_timezone = options
            .get("timezone")
            .and_then(|v| v.as_str())
            .map(|tz| !tz.is_empty())
            .unwrap_or(false);
        if !has_timezone {
            options.insert("timezone".to_string(), Value::String(app_timezone.to_string()));
        }
        Value::Object(options)
    }
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config(path, &config)?;
        tracing::info!("Created default configuration at {:?}", path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(())
}
