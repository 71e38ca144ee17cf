//! S3驱动核心实现
//!
//! 设计原则：
//! - 对象存储没有目录，目录由以 `/` 结尾的零字节占位对象表示
//! - 列举统一走 `valid_path` 规范化后的前缀
//! - 移动 = 复制 + 删除，非原子

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::client::S3Store;
use super::config::{DirectoryMarkers, S3Config};
use crate::error::{DiskError, Result};
use crate::storage::{Disk, ObjectInfo, ObjectStore, SourceFile};
use crate::utils::{self, SEPARATOR};

/// S3驱动
#[derive(Clone)]
pub struct S3Driver {
    disk: String,
    url: String,
    timezone: String,
    markers: DirectoryMarkers,
    store: Arc<dyn ObjectStore>,
    token: CancellationToken,
}

impl S3Driver {
    /// Validate the config and connect to the endpoint / 校验配置并连接
    pub fn new(disk: &str, config: &S3Config, token: CancellationToken) -> Result<Self> {
        config.validate(disk)?;
        let store = S3Store::connect(config).map_err(|source| DiskError::ConnectionInit {
            disk: disk.to_string(),
            source,
        })?;
        Ok(Self::with_store(disk, config, Arc::new(store), token))
    }

    /// Build on an already connected store / 使用已有的存储客户端
    pub fn with_store(
        disk: &str,
        config: &S3Config,
        store: Arc<dyn ObjectStore>,
        token: CancellationToken,
    ) -> Self {
        Self {
            disk: disk.to_string(),
            url: config.url.clone(),
            timezone: config.timezone.clone(),
            markers: config.directory_markers,
            store,
            token,
        }
    }

    /// 绑定的取消令牌
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Race a remote call against the cancellation token / 远程调用与取消令牌竞争
    async fn guarded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(DiskError::Cancelled),
            res = fut => res,
        }
    }

    /// List entries under an already normalized prefix; the first error aborts
    async fn list_entries(&self, prefix: &str, recursive: bool) -> Result<Vec<ObjectInfo>> {
        self.guarded(async {
            let mut stream = self.store.list(prefix, recursive);
            let mut entries = Vec::new();
            while let Some(item) = stream.next().await {
                if self.token.is_cancelled() {
                    return Err(DiskError::Cancelled);
                }
                entries.push(item?);
            }
            Ok(entries)
        })
        .await
    }

    /// Direct child directory keys (full keys) of a normalized prefix / 子目录完整键
    async fn child_directories(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .list_entries(prefix, false)
            .await?
            .into_iter()
            .filter(|entry| entry.is_dir() && entry.key != prefix)
            .map(|entry| entry.key)
            .collect())
    }

    async fn stat(&self, file: &str) -> Result<ObjectInfo> {
        self.guarded(async { Ok(self.store.stat(file).await?) }).await
    }

    fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| DiskError::Timezone {
            name: self.timezone.clone(),
            reason: e.to_string(),
        })
    }

    /// 需要补建的目录占位对象
    fn markers_for(&self, key: &str) -> Vec<String> {
        match self.markers {
            DirectoryMarkers::All => utils::parent_markers(key),
            // 仅为文件补建第一级目录
            DirectoryMarkers::TopLevel if key.ends_with(SEPARATOR) => Vec::new(),
            DirectoryMarkers::TopLevel => {
                let mut markers = utils::parent_markers(key);
                markers.truncate(1);
                markers
            }
        }
    }

    async fn put_object(&self, key: &str, content: Bytes) -> Result<()> {
        let content_type = utils::detect_mime(&content);
        self.guarded(async { Ok(self.store.put(key, content, &content_type).await?) })
            .await
    }
}

#[async_trait]
impl Disk for S3Driver {
    fn name(&self) -> &str {
        &self.disk
    }

    async fn files(&self, path: &str) -> Result<Vec<String>> {
        let prefix = utils::valid_path(path);
        Ok(self
            .list_entries(&prefix, false)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dir())
            .map(|entry| utils::strip_key(&entry.key, &prefix).to_string())
            .collect())
    }

    async fn directories(&self, path: &str) -> Result<Vec<String>> {
        let prefix = utils::valid_path(path);
        Ok(self
            .child_directories(&prefix)
            .await?
            .iter()
            .map(|key| utils::strip_key(key, &prefix).to_string())
            .collect())
    }

    async fn all_files(&self, path: &str) -> Result<Vec<String>> {
        let prefix = utils::valid_path(path);
        Ok(self
            .list_entries(&prefix, true)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dir())
            .map(|entry| utils::strip_key(&entry.key, &prefix).to_string())
            .collect())
    }

    async fn all_directories(&self, path: &str) -> Result<Vec<String>> {
        let root = utils::valid_path(path);
        let mut directories = Vec::new();

        // 显式栈做深度优先遍历：父目录先于子目录，兄弟按列举顺序
        let mut stack: Vec<String> = self.child_directories(&root).await?;
        stack.reverse();

        while let Some(key) = stack.pop() {
            directories.push(utils::strip_key(&key, &root).to_string());
            let children = self
                .child_directories(&key)
                .await
                .map_err(|e| DiskError::traversal(&key, e))?;
            stack.extend(children.into_iter().rev());
        }

        Ok(directories)
    }

    async fn exists(&self, file: &str) -> bool {
        match self.stat(file).await {
            Ok(_) => true,
            Err(e) => {
                // 不区分"不存在"与其他错误
                if !matches!(e, DiskError::Remote(ref inner) if inner.is_not_found()) {
                    tracing::warn!("S3 stat failed, treating {} as missing: {}", file, e);
                }
                false
            }
        }
    }

    async fn get(&self, file: &str) -> Result<String> {
        let data = self.get_bytes(file).await?;
        String::from_utf8(data.to_vec()).map_err(|e| {
            DiskError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    async fn get_bytes(&self, file: &str) -> Result<Bytes> {
        self.guarded(async { Ok(self.store.get(file).await?) }).await
    }

    async fn size(&self, file: &str) -> Result<u64> {
        Ok(self.stat(file).await?.size)
    }

    async fn mime_type(&self, file: &str) -> Result<String> {
        Ok(self.stat(file).await?.content_type)
    }

    async fn last_modified(&self, file: &str) -> Result<DateTime<Tz>> {
        let info = self.stat(file).await?;
        let tz = self.tz()?;
        Ok(info.last_modified.with_timezone(&tz))
    }

    async fn put(&self, file: &str, content: Bytes) -> Result<()> {
        // 直接写入嵌套目录时无法判断目录是否存在，先补建目录占位
        for marker in self.markers_for(file) {
            tracing::debug!("S3 put: ensure directory marker {}", marker);
            self.put_object(&marker, Bytes::new()).await?;
        }
        self.put_object(file, content).await
    }

    async fn put_file(&self, file_path: &str, source: &dyn SourceFile) -> Result<String> {
        self.put_file_as(file_path, source, &utils::random_name(utils::RANDOM_NAME_LEN))
            .await
    }

    async fn put_file_as(&self, file_path: &str, source: &dyn SourceFile, name: &str) -> Result<String> {
        let data = source.read().await?;
        let full_path = utils::full_path_of_file(file_path, source.path(), &data, name)?;
        self.put(&full_path, data).await?;
        Ok(full_path)
    }

    async fn make_directory(&self, directory: &str) -> Result<()> {
        let key = utils::valid_path(directory);
        if key.is_empty() {
            return Err(DiskError::InvalidPath {
                path: directory.to_string(),
                reason: "directory name is empty",
            });
        }
        self.put(&key, Bytes::new()).await
    }

    async fn copy(&self, origin_file: &str, target_file: &str) -> Result<()> {
        self.guarded(async { Ok(self.store.copy(origin_file, target_file).await?) })
            .await
    }

    async fn move_file(&self, old_file: &str, new_file: &str) -> Result<()> {
        self.copy(old_file, new_file).await?;
        self.delete(&[old_file]).await
    }

    async fn delete(&self, files: &[&str]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel::<String>(files.len());
        for file in files {
            // 容量等于键数量，不会阻塞
            if tx.try_send(file.to_string()).is_err() {
                break;
            }
        }
        drop(tx);

        self.guarded(async {
            let mut errors = self.store.remove_many(ReceiverStream::new(rx).boxed());
            match errors.next().await {
                Some(err) => Err(err.into()),
                None => Ok(()),
            }
        })
        .await
    }

    async fn delete_directory(&self, directory: &str) -> Result<()> {
        let prefix = utils::valid_path(directory);
        if prefix.is_empty() {
            return Err(DiskError::InvalidPath {
                path: directory.to_string(),
                reason: "refusing to delete the bucket root",
            });
        }
        self.guarded(async { Ok(self.store.remove_one(&prefix, true).await?) })
            .await
    }

    fn url(&self, file: &str) -> String {
        let bucket = self.store.bucket();
        let mut real_url = self.url.trim_end_matches(SEPARATOR).to_string();
        if !real_url.ends_with(bucket) {
            real_url.push(SEPARATOR);
            real_url.push_str(bucket);
        }
        format!("{}{}{}", real_url, SEPARATOR, file.trim_start_matches(SEPARATOR))
    }

    async fn temporary_url(&self, file: &str, expires_at: DateTime<Utc>) -> Result<String> {
        let ttl = (expires_at - Utc::now())
            .to_std()
            .ok()
            .filter(|ttl| !ttl.is_zero())
            .ok_or(DiskError::InvalidExpiry(expires_at))?;
        let key = file.trim_start_matches(SEPARATOR);
        self.guarded(async { Ok(self.store.presign_get(key, ttl).await?) })
            .await
    }

    fn with_cancellation(&self, token: CancellationToken) -> Option<Arc<dyn Disk>> {
        match self.store.reconnect() {
            Ok(store) => Some(Arc::new(Self {
                store,
                token,
                ..self.clone()
            })),
            Err(e) => {
                tracing::error!("init {} disk fail: {}", self.disk, e);
                None
            }
        }
    }
}
