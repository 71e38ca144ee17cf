//! In-memory object store / 内存对象存储
//!
//! Mirrors the listing rules of an S3 bucket: non-recursive listings fold
//! deeper keys into `/`-terminated common prefixes.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::{ObjectInfo, ObjectStore};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// Bucket held in process memory / 进程内存储桶
#[derive(Debug, Clone)]
pub struct MemoryStore {
    bucket: String,
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// All stored keys in order / 全部对象键
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    fn info(key: &str, object: &StoredObject) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            size: object.data.len() as u64,
            content_type: object.content_type.clone(),
            last_modified: object.last_modified,
        }
    }

    fn snapshot(&self, prefix: &str, recursive: bool) -> Vec<ObjectInfo> {
        let objects = self.objects.read();
        let mut entries: Vec<ObjectInfo> = Vec::new();

        for (key, object) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            if recursive {
                entries.push(Self::info(key, object));
                continue;
            }
            match rest.find('/') {
                Some(pos) => {
                    // 折叠为公共前缀
                    let common = format!("{}{}", prefix, &rest[..=pos]);
                    if entries.last().map(|e| e.key.as_str()) != Some(common.as_str()) {
                        entries.push(ObjectInfo {
                            key: common,
                            size: 0,
                            content_type: String::new(),
                            last_modified: object.last_modified,
                        });
                    }
                }
                None => entries.push(Self::info(key, object)),
            }
        }
        entries
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn list<'a>(&'a self, prefix: &'a str, recursive: bool) -> BoxStream<'a, StoreResult<ObjectInfo>> {
        stream::iter(self.snapshot(prefix, recursive).into_iter().map(Ok)).boxed()
    }

    async fn stat(&self, key: &str) -> StoreResult<ObjectInfo> {
        self.objects
            .read()
            .get(key)
            .map(|object| Self::info(key, object))
            .ok_or_else(|| StoreError::NotFound { key: key.to_string() })
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        self.objects
            .read()
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| StoreError::NotFound { key: key.to_string() })
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<()> {
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> StoreResult<()> {
        let mut objects = self.objects.write();
        let mut object = objects
            .get(src_key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { key: src_key.to_string() })?;
        object.last_modified = Utc::now();
        objects.insert(dst_key.to_string(), object);
        Ok(())
    }

    async fn remove_one(&self, key: &str, force_recursive: bool) -> StoreResult<()> {
        let mut objects = self.objects.write();
        if force_recursive {
            objects.retain(|k, _| !k.starts_with(key));
        } else {
            objects.remove(key);
        }
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        Ok(format!(
            "memory://{}/{}?X-Amz-Expires={}",
            self.bucket,
            urlencoding::encode(key),
            ttl.as_secs()
        ))
    }

    fn reconnect(&self) -> StoreResult<Arc<dyn ObjectStore>> {
        Ok(Arc::new(self.clone()))
    }
}
