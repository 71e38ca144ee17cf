use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StoreError, StoreResult};

/// Object metadata as reported by the store / 对象元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Full object key / 完整对象键
    pub key: String,
    pub size: u64,
    pub content_type: String,
    /// UTC timestamp of the last write / 最后修改时间（UTC）
    pub last_modified: DateTime<Utc>,
}

impl ObjectInfo {
    /// Keys ending in `/` are directory markers / 以 `/` 结尾的键是目录标记
    pub fn is_dir(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// Object store client capability bound to one bucket / 绑定单个存储桶的对象存储客户端
///
/// Only primitives live here; directory emulation is built on top by the
/// drivers.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket this client talks to / 存储桶名称
    fn bucket(&self) -> &str;

    /// List keys under `prefix`, either direct children or the whole subtree.
    /// Non-recursive listings report sub-prefixes as keys ending in `/`.
    fn list<'a>(&'a self, prefix: &'a str, recursive: bool) -> BoxStream<'a, StoreResult<ObjectInfo>>;

    /// Head an exact key / 查询对象元数据
    async fn stat(&self, key: &str) -> StoreResult<ObjectInfo>;

    /// Read a whole object / 读取对象
    async fn get(&self, key: &str) -> StoreResult<Bytes>;

    /// Write a whole object / 写入对象
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<()>;

    /// Server-side copy / 服务端复制
    async fn copy(&self, src_key: &str, dst_key: &str) -> StoreResult<()>;

    /// Remove one key, or everything under it when `force_recursive` is set.
    /// Removing an absent key succeeds.
    async fn remove_one(&self, key: &str, force_recursive: bool) -> StoreResult<()>;

    /// Bulk remove; yields one error per key that failed / 批量删除
    fn remove_many<'a>(&'a self, keys: BoxStream<'a, String>) -> BoxStream<'a, StoreError> {
        keys.filter_map(move |key| async move { self.remove_one(&key, false).await.err() })
            .boxed()
    }

    /// Time-limited download URL / 预签名下载链接
    async fn presign_get(&self, key: &str, ttl: Duration) -> StoreResult<String>;

    /// Build a fresh client with the same settings / 重新创建客户端连接
    fn reconnect(&self) -> StoreResult<Arc<dyn ObjectStore>>;
}

/// Readable upload source / 上传源文件
#[async_trait]
pub trait SourceFile: Send + Sync {
    /// Location of the source, also used for extension fallback / 源文件路径
    fn path(&self) -> &Path;

    /// Read the full content into memory / 读取全部内容
    async fn read(&self) -> std::io::Result<Bytes> {
        Ok(Bytes::from(tokio::fs::read(self.path()).await?))
    }
}

/// Source file on the local filesystem / 本地文件
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceFile for LocalFile {
    fn path(&self) -> &Path {
        &self.path
    }
}

/// Filesystem-style disk interface / 文件系统磁盘接口
///
/// Paths are object keys; listing operations accept loosely formed paths
/// (`./x`, `/x`, `x/`) and return keys relative to the listed directory.
#[async_trait]
pub trait Disk: Send + Sync {
    /// Disk name / 磁盘名称
    fn name(&self) -> &str;

    /// Direct child files / 列出当前目录文件
    async fn files(&self, path: &str) -> Result<Vec<String>>;

    /// Direct child directories, each ending in `/` / 列出当前目录子目录
    async fn directories(&self, path: &str) -> Result<Vec<String>>;

    /// Every file in the subtree / 递归列出全部文件
    async fn all_files(&self, path: &str) -> Result<Vec<String>>;

    /// Every directory in the subtree, parents before descendants / 递归列出全部目录
    async fn all_directories(&self, path: &str) -> Result<Vec<String>>;

    /// Whether the exact key exists; any failure reads as absent / 是否存在
    async fn exists(&self, file: &str) -> bool;

    async fn missing(&self, file: &str) -> bool {
        !self.exists(file).await
    }

    async fn get(&self, file: &str) -> Result<String>;

    async fn get_bytes(&self, file: &str) -> Result<Bytes>;

    async fn size(&self, file: &str) -> Result<u64>;

    async fn mime_type(&self, file: &str) -> Result<String>;

    /// Last write time in the configured timezone / 最后修改时间（配置时区）
    async fn last_modified(&self, file: &str) -> Result<DateTime<Tz>>;

    /// Write content, materializing parent directory markers / 写入内容
    async fn put(&self, file: &str, content: Bytes) -> Result<()>;

    /// Upload a source file under a random name; returns the stored key / 随机名上传
    async fn put_file(&self, file_path: &str, source: &dyn SourceFile) -> Result<String>;

    /// Upload a source file under `name`; returns the stored key / 指定名上传
    async fn put_file_as(&self, file_path: &str, source: &dyn SourceFile, name: &str) -> Result<String>;

    async fn make_directory(&self, directory: &str) -> Result<()>;

    async fn copy(&self, origin_file: &str, target_file: &str) -> Result<()>;

    /// Copy then delete; not atomic / 复制后删除（非原子）
    async fn move_file(&self, old_file: &str, new_file: &str) -> Result<()>;

    /// Remove explicit keys; directories are not expanded / 删除指定键
    async fn delete(&self, files: &[&str]) -> Result<()>;

    /// Remove a directory and everything under it / 递归删除目录
    async fn delete_directory(&self, directory: &str) -> Result<()>;

    fn path(&self, file: &str) -> String {
        file.to_string()
    }

    /// Public URL of an object / 公开访问链接
    fn url(&self, file: &str) -> String;

    /// Pre-signed URL valid until `expires_at` / 临时访问链接
    async fn temporary_url(&self, file: &str, expires_at: DateTime<Utc>) -> Result<String>;

    /// Same disk bound to another cancellation token; `None` if the client
    /// could not be rebuilt / 绑定新的取消令牌
    fn with_cancellation(&self, token: CancellationToken) -> Option<Arc<dyn Disk>>;
}

pub mod manager;
pub mod memory;

pub use manager::{DiskFactory, DiskManager};
pub use memory::MemoryStore;
