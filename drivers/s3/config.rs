//! S3驱动配置

use serde::{Deserialize, Serialize};

use crate::error::{DiskError, Result};

/// Which parent directory markers a nested write creates / 写入时创建哪些目录标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryMarkers {
    /// Only the first path segment, e.g. `a/` for `a/b/c.txt` / 仅第一级目录
    TopLevel,
    /// Every ancestor, e.g. `a/` and `a/b/` / 全部上级目录
    #[default]
    All,
}

/// S3配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Access Key ID
    #[serde(default)]
    pub key: String,
    /// Secret Access Key
    #[serde(default)]
    pub secret: String,
    /// 区域（可选）
    #[serde(default)]
    pub region: String,
    /// 存储桶名称
    #[serde(default)]
    pub bucket: String,
    /// 公开访问地址，如 http://127.0.0.1:9000/goravel
    #[serde(default)]
    pub url: String,
    /// 是否使用 https 连接端点
    #[serde(default)]
    pub ssl: bool,
    /// S3端点地址，可带或不带 scheme
    /// AWS: s3.{region}.amazonaws.com
    /// MinIO: 127.0.0.1:9000
    #[serde(default)]
    pub endpoint: String,
    /// 时区名称，用于 last_modified
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// 强制使用路径风格（而非虚拟主机风格）
    /// MinIO等需要设置为true
    #[serde(default = "default_path_style")]
    pub path_style: bool,
    /// 目录占位策略
    #[serde(default)]
    pub directory_markers: DirectoryMarkers,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_path_style() -> bool {
    true
}

fn default_region() -> &'static str {
    "us-east-1"
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            key: String::new(),
            secret: String::new(),
            region: String::new(),
            bucket: String::new(),
            url: String::new(),
            ssl: false,
            endpoint: String::new(),
            timezone: default_timezone(),
            path_style: default_path_style(),
            directory_markers: DirectoryMarkers::default(),
        }
    }
}

impl S3Config {
    /// Read the `MINIO_*` environment variables / 从环境变量读取配置
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup / 从任意变量来源读取配置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).unwrap_or_default();
        let ssl = matches!(get("MINIO_SSL").trim().to_ascii_lowercase().as_str(), "true" | "1");
        let timezone = lookup("APP_TIMEZONE")
            .filter(|tz| !tz.is_empty())
            .unwrap_or_else(default_timezone);

        Self {
            key: get("MINIO_ACCESS_KEY_ID"),
            secret: get("MINIO_ACCESS_KEY_SECRET"),
            region: get("MINIO_REGION"),
            bucket: get("MINIO_BUCKET"),
            url: get("MINIO_URL"),
            ssl,
            endpoint: get("MINIO_ENDPOINT"),
            timezone,
            ..Self::default()
        }
    }

    /// Check required fields / 校验必填项
    pub fn validate(&self, disk: &str) -> Result<()> {
        let missing: Vec<&str> = [
            ("key", &self.key),
            ("secret", &self.secret),
            ("bucket", &self.bucket),
            ("url", &self.url),
            ("endpoint", &self.endpoint),
            ("timezone", &self.timezone),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();

        if !missing.is_empty() {
            return Err(DiskError::Config {
                disk: disk.to_string(),
                reason: format!("missing {}", missing.join(", ")),
            });
        }

        url::Url::parse(&self.url).map_err(|e| DiskError::Config {
            disk: disk.to_string(),
            reason: format!("invalid url {}: {}", self.url, e),
        })?;

        Ok(())
    }

    /// Endpoint host with any scheme stripped / 去掉 scheme 的端点
    pub fn endpoint_host(&self) -> &str {
        let host = self.endpoint.trim();
        let host = host.strip_prefix("http://").unwrap_or(host);
        let host = host.strip_prefix("https://").unwrap_or(host);
        host.trim_end_matches('/')
    }

    /// Endpoint URL handed to the client / 客户端使用的端点地址
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}", scheme, self.endpoint_host())
    }

    /// Region, falling back to us-east-1 / 区域，缺省为 us-east-1
    pub fn region_or_default(&self) -> &str {
        if self.region.trim().is_empty() {
            default_region()
        } else {
            self.region.trim()
        }
    }
}
