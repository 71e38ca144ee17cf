//! S3客户端封装
//!
//! 只提供对象存储原语（list / stat / get / put / copy / remove / presign），
//! 目录模拟逻辑在 driver.rs 中实现。

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::serde_types::ListBucketResult;
use s3::Region;

use super::config::S3Config;
use crate::error::{StoreError, StoreResult};
use crate::storage::{ObjectInfo, ObjectStore};

/// S3 bucket client / S3存储桶客户端
pub struct S3Store {
    config: S3Config,
    bucket: Box<Bucket>,
}

impl S3Store {
    /// 创建S3 Bucket客户端
    pub fn connect(config: &S3Config) -> StoreResult<Self> {
        let credentials = Credentials::new(
            Some(&config.key),
            Some(&config.secret),
            None,
            None,
            None,
        )
        .map_err(|e| anyhow!("创建S3凭证失败: {}", e))?;

        let region = Region::Custom {
            region: config.region_or_default().to_string(),
            endpoint: config.endpoint_url(),
        };

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| anyhow!("创建S3 Bucket失败: {}", e))?;

        let bucket = if config.path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        tracing::debug!(
            "S3 client ready: endpoint={}, bucket={}",
            config.endpoint_url(),
            config.bucket
        );

        Ok(Self {
            config: config.clone(),
            bucket,
        })
    }

    fn check_status(op: &'static str, key: &str, code: u16) -> StoreResult<()> {
        match code {
            200..=299 => Ok(()),
            404 => Err(StoreError::NotFound { key: key.to_string() }),
            _ => Err(StoreError::Status {
                op,
                key: key.to_string(),
                code,
            }),
        }
    }

    /// 将一页列举结果转换为条目：先文件，后公共前缀
    fn page_entries(page: ListBucketResult) -> StoreResult<Vec<ObjectInfo>> {
        let mut entries = Vec::with_capacity(page.contents.len());
        for obj in page.contents {
            entries.push(ObjectInfo {
                content_type: mime_guess::from_path(&obj.key)
                    .first_or_octet_stream()
                    .to_string(),
                last_modified: parse_rfc3339(&obj.last_modified)?,
                size: obj.size,
                key: obj.key,
            });
        }

        // 公共前缀没有修改时间
        for cp in page.common_prefixes.unwrap_or_default() {
            entries.push(ObjectInfo {
                key: cp.prefix,
                size: 0,
                content_type: String::new(),
                last_modified: Utc::now(),
            });
        }
        Ok(entries)
    }

    /// 下一页的状态：被截断且带续传令牌时继续
    fn next_page(page: &ListBucketResult) -> Option<Option<String>> {
        if page.is_truncated {
            page.next_continuation_token.clone().map(Some)
        } else {
            None
        }
    }

    /// 按续传令牌逐页列举，每页到达即产出
    fn pages<'a>(
        &'a self,
        prefix: &'a str,
        delimiter: Option<String>,
    ) -> BoxStream<'a, StoreResult<ListBucketResult>> {
        // None: 已结束；Some(token): 下一页的续传令牌
        stream::try_unfold(Some(None::<String>), move |state| {
            let delimiter = delimiter.clone();
            async move {
                let Some(token) = state else {
                    return Ok(None);
                };
                let (page, code) = self
                    .bucket
                    .list_page(prefix.to_string(), delimiter, token, None, None)
                    .await
                    .map_err(|e| anyhow!("列出S3对象失败: {}", e))?;
                Self::check_status("list", prefix, code)?;

                let next = Self::next_page(&page);
                Ok::<_, StoreError>(Some((page, next)))
            }
        })
        .boxed()
    }

    /// 逐个删除前缀下的全部对象
    async fn remove_prefix(&self, prefix: &str) -> StoreResult<()> {
        let mut pages = self.pages(prefix, None);
        while let Some(page) = pages.next().await {
            for obj in page?.contents {
                self.remove_key(&obj.key).await?;
            }
        }
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> StoreResult<()> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| anyhow!("删除S3对象失败: {}", e))?;
        match Self::check_status("delete", key, response.status_code()) {
            Err(StoreError::NotFound { .. }) => Ok(()),
            other => other,
        }
    }
}

fn parse_rfc3339(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(anyhow!("无法解析时间 {:?}: {}", value, e)))
}

fn parse_http_date(value: &str) -> StoreResult<DateTime<Utc>> {
    match DateTime::parse_from_rfc2822(value) {
        Ok(t) => Ok(t.with_timezone(&Utc)),
        Err(_) => parse_rfc3339(value),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    fn list<'a>(&'a self, prefix: &'a str, recursive: bool) -> BoxStream<'a, StoreResult<ObjectInfo>> {
        let delimiter = if recursive { None } else { Some("/".to_string()) };
        tracing::debug!("S3 list: prefix={}, recursive={}", prefix, recursive);

        self.pages(prefix, delimiter)
            .and_then(|page| async move { Self::page_entries(page) })
            .map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<_, StoreError>)))
            .try_flatten()
            .boxed()
    }

    async fn stat(&self, key: &str) -> StoreResult<ObjectInfo> {
        let (head, code) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| anyhow!("获取S3对象信息失败: {}", e))?;
        Self::check_status("stat", key, code)?;

        Ok(ObjectInfo {
            key: key.to_string(),
            size: head.content_length.unwrap_or(0).max(0) as u64,
            content_type: head.content_type.unwrap_or_else(|| {
                mime_guess::from_path(key).first_or_octet_stream().to_string()
            }),
            last_modified: parse_http_date(head.last_modified.as_deref().ok_or_else(|| {
                StoreError::Backend(anyhow!("S3对象缺少Last-Modified: {}", key))
            })?)?,
        })
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| anyhow!("获取S3对象失败: {}", e))?;
        Self::check_status("get", key, response.status_code())?;
        Ok(Bytes::copy_from_slice(response.bytes()))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<()> {
        tracing::debug!("S3 put: key={}, size={}, type={}", key, data.len(), content_type);
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| anyhow!("上传S3对象失败: {}", e))?;
        Self::check_status("put", key, response.status_code())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> StoreResult<()> {
        // copy_object_internal的from参数需要URL编码（中文等非ASCII字符）
        let encoded_src = urlencoding::encode(src_key);
        tracing::debug!("S3 CopyObject: src_key={}, encoded={}, dst_key={}", src_key, encoded_src, dst_key);

        let code = self
            .bucket
            .copy_object_internal(&encoded_src, dst_key)
            .await
            .map_err(|e| anyhow!("S3 CopyObject失败: {}", e))?;
        Self::check_status("copy", src_key, code)?;

        // 验证新文件是否存在
        let (_, code) = self
            .bucket
            .head_object(dst_key)
            .await
            .map_err(|e| anyhow!("验证复制结果失败: {}", e))?;
        Self::check_status("copy", dst_key, code)
    }

    async fn remove_one(&self, key: &str, force_recursive: bool) -> StoreResult<()> {
        tracing::debug!("S3 remove: key={}, force={}", key, force_recursive);
        if force_recursive {
            self.remove_prefix(key).await
        } else {
            self.remove_key(key).await
        }
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> StoreResult<String> {
        let expire_secs = ttl.as_secs().clamp(1, u32::MAX as u64) as u32;
        let url = self
            .bucket
            .presign_get(key, expire_secs, None)
            .await
            .map_err(|e| anyhow!("生成预签名URL失败: {}", e))?;
        Ok(url)
    }

    fn reconnect(&self) -> StoreResult<Arc<dyn ObjectStore>> {
        Ok(Arc::new(Self::connect(&self.config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            key: "j45vy0yIvvhs47uf".to_string(),
            secret: "jgwB91UEJ1LBA9cVYfbVqP7eXpHHrpDs".to_string(),
            bucket: "goravel".to_string(),
            url: "http://127.0.0.1:9000/goravel".to_string(),
            endpoint: "http://127.0.0.1:9000".to_string(),
            ..S3Config::default()
        }
    }

    #[test]
    fn test_connect_without_network() {
        let store = S3Store::connect(&config()).unwrap();
        assert_eq!(store.bucket(), "goravel");
        assert!(store.reconnect().is_ok());
    }

    #[test]
    fn test_check_status() {
        assert!(S3Store::check_status("get", "a", 200).is_ok());
        assert!(S3Store::check_status("get", "a", 404).unwrap_err().is_not_found());
        assert!(matches!(
            S3Store::check_status("get", "a", 403),
            Err(StoreError::Status { code: 403, .. })
        ));
    }

    #[test]
    fn test_parse_dates() {
        let t = parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!(t.to_rfc3339(), "2015-10-21T07:28:00+00:00");
        let t = parse_rfc3339("2015-10-21T07:28:00.000Z").unwrap();
        assert_eq!(t.timestamp(), 1445412480);
        assert_eq!(parse_http_date("2015-10-21T07:28:00Z").unwrap().timestamp(), 1445412480);
    }

    #[test]
    fn test_parse_dates_rejects_garbage() {
        assert!(matches!(parse_http_date("garbage"), Err(StoreError::Backend(_))));
        assert!(parse_rfc3339("").is_err());
    }

    fn page(contents: serde_json::Value, prefixes: serde_json::Value) -> ListBucketResult {
        serde_json::from_value(serde_json::json!({
            "Name": "goravel",
            "Contents": contents,
            "CommonPrefixes": prefixes,
        }))
        .unwrap()
    }

    #[test]
    fn test_page_entries_order_and_types() {
        let page = page(
            serde_json::json!([
                { "Key": "d/", "LastModified": "2015-10-21T07:28:00.000Z", "Size": 0 },
                { "Key": "d/1.txt", "LastModified": "2015-10-21T07:28:00.000Z", "Size": 7 },
                { "Key": "d/raw", "LastModified": "2015-10-21T07:28:00.000Z", "Size": 3 },
            ]),
            serde_json::json!([{ "Prefix": "d/3/" }, { "Prefix": "d/4/" }]),
        );

        let entries = S3Store::page_entries(page).unwrap();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["d/", "d/1.txt", "d/raw", "d/3/", "d/4/"]);
        assert_eq!(entries[1].content_type, "text/plain");
        assert_eq!(entries[1].size, 7);
        assert_eq!(entries[1].last_modified.timestamp(), 1445412480);
        assert_eq!(entries[2].content_type, "application/octet-stream");
        assert!(entries[3].is_dir() && entries[4].is_dir());
    }

    #[test]
    fn test_next_page() {
        let mut last = page(serde_json::json!([]), serde_json::Value::Null);
        assert_eq!(S3Store::next_page(&last), None);

        last.is_truncated = true;
        assert_eq!(S3Store::next_page(&last), None);

        last.next_continuation_token = Some("1ueGcxLPRx1Tr".to_string());
        assert_eq!(
            S3Store::next_page(&last),
            Some(Some("1ueGcxLPRx1Tr".to_string()))
        );
    }

    #[test]
    fn test_page_entries_rejects_bad_timestamp() {
        let page = page(
            serde_json::json!([{ "Key": "a.txt", "LastModified": "yesterday", "Size": 1 }]),
            serde_json::Value::Null,
        );
        assert!(matches!(S3Store::page_entries(page), Err(StoreError::Backend(_))));
    }
}
