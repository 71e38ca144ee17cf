//! Error types / 错误类型
//!
//! `StoreError` is what an object-store client reports; `DiskError` is what the
//! filesystem layer hands back to callers.

/// Object store client error / 对象存储客户端错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Key does not exist / 对象不存在
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Store answered with an unexpected HTTP status / 非预期的状态码
    #[error("{op} {key} failed with status {code}")]
    Status {
        op: &'static str,
        key: String,
        code: u16,
    },

    /// Any other backend failure / 其他后端错误
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Status { code, .. } => *code == 404,
            StoreError::Backend(_) => false,
        }
    }
}

/// Filesystem layer error / 文件系统层错误
#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    /// Required configuration is missing or malformed / 配置缺失或非法
    #[error("please set {disk} configuration first: {reason}")]
    Config { disk: String, reason: String },

    /// Client construction failed / 客户端初始化失败
    #[error("init {disk} disk error: {source}")]
    ConnectionInit {
        disk: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Remote(#[from] StoreError),

    /// A nested level of a directory walk failed / 目录遍历中途失败
    #[error("walking {prefix} failed: {source}")]
    Traversal {
        prefix: String,
        #[source]
        source: Box<DiskError>,
    },

    #[error("invalid timezone {name}: {reason}")]
    Timezone { name: String, reason: String },

    #[error("expiry {0} is not in the future")]
    InvalidExpiry(chrono::DateTime<chrono::Utc>),

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The bound cancellation token fired / 操作已取消
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DiskError {
    /// Wrap an error raised below the root of a walk, keeping the innermost prefix
    pub(crate) fn traversal(prefix: &str, err: DiskError) -> Self {
        match err {
            DiskError::Traversal { .. } | DiskError::Cancelled => err,
            other => DiskError::Traversal {
                prefix: prefix.to_string(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T, E = DiskError> = std::result::Result<T, E>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
