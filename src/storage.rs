use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::config::MediaConfig;

/// Object store for uploaded media.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    async fn head_object(&self, key: &str) -> anyhow::Result<bool>;
    /// Body and content type, or `None` when the key is absent.
    async fn get_object(&self, key: &str) -> anyhow::Result<Option<(Bytes, String)>>;
    /// Time-limited download URL; `None` when the backend cannot hand out URLs
    /// and callers must serve the bytes themselves.
    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<Option<String>>;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(cfg: &MediaConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    async fn head_object(&self, key: &str) -> anyhow::Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(anyhow::Error::new(e).context("s3 head_object"))
                }
            }
        }
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<(Bytes, String)>> {
        let out = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => out,
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    return Ok(None);
                }
                return Err(anyhow::Error::new(e).context("s3 get_object"));
            }
        };
        let content_type = out
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = out
            .body
            .collect()
            .await
            .context("s3 get_object body")?
            .into_bytes();
        Ok(Some((body, content_type)))
    }

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<Option<String>> {
        let req = self.client.get_object().bucket(&self.bucket).key(key);
        let presigned = req
            .presigned(PresigningConfig::expires_in(
                std::time::Duration::from_secs(seconds),
            )?)
            .await
            .context("s3 presign_get")?;
        Ok(Some(presigned.uri().to_string()))
    }
}

struct StoredObject {
    body: Bytes,
    content_type: String,
}

/// Process-local object store used when no bucket is configured.
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn head_object(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<(Bytes, String)>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|o| (o.body.clone(), o.content_type.clone())))
    }

    async fn presign_get(&self, _key: &str, _seconds: u64) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_storage_put_head_delete() {
        let storage = MemoryStorage::new();
        assert!(!storage.head_object("images/a.jpg").await.unwrap());

        storage
            .put_object("images/a.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
        assert!(storage.head_object("images/a.jpg").await.unwrap());
        let (body, ct) = storage.get_object("images/a.jpg").await.unwrap().unwrap();
        assert_eq!(&body[..], b"jpeg");
        assert_eq!(ct, "image/jpeg");
        assert!(storage.get_object("images/b.jpg").await.unwrap().is_none());

        assert_eq!(storage.presign_get("images/a.jpg", 600).await.unwrap(), None);

        storage.delete_object("images/a.jpg").await.unwrap();
        assert!(!storage.head_object("images/a.jpg").await.unwrap());
    }
}
