// Blob store adapter
//
// Locators are scheme-prefixed bucket/key strings (`s3://bucket/key`). The
// production client speaks plain HTTP to an S3-compatible gateway endpoint;
// request signing is the gateway's concern, the worker only attaches an
// optional bearer token.

use anyhow::Context;
use async_trait::async_trait;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::config::Config;
use crate::core::errors::{StorageError, StorageResult};
use crate::utils::load_image_from_memory_async;

/// Key/value image blob store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch and decode the image at `locator`.
    async fn fetch(&self, locator: &str) -> StorageResult<DynamicImage>;

    /// Store `bytes` under `key` in the configured bucket; returns the
    /// locator of the stored blob.
    async fn store(&self, bytes: Vec<u8>, key: &str, content_type: &str) -> StorageResult<String>;
}

/// Split an `s3://bucket/key` locator into bucket and key.
pub fn parse_locator(locator: &str) -> StorageResult<(&str, &str)> {
    let trimmed = locator.strip_prefix("s3://").unwrap_or(locator);
    trimmed
        .split_once('/')
        .filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
        .ok_or_else(|| StorageError::InvalidLocator(locator.to_string()))
}

/// HTTP client for an S3-compatible storage gateway
pub struct S3Gateway {
    config: Arc<Config>,
    http_client: reqwest::Client,
}

impl S3Gateway {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        // Connection pooling matters here: every job makes eight storage
        // calls minimum (one fetch, seven uploads)
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to create storage HTTP client")?;

        Ok(Self { config, http_client })
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        let endpoint = self
            .config
            .storage
            .endpoint
            .as_deref()
            .unwrap_or("http://127.0.0.1:9000");
        format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.storage.access_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStore for S3Gateway {
    async fn fetch(&self, locator: &str) -> StorageResult<DynamicImage> {
        let (bucket, key) = parse_locator(locator)?;
        debug!(bucket, key, "Fetching source image");

        let response = self
            .authorize(self.http_client.get(self.object_url(bucket, key)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus {
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        load_image_from_memory_async(bytes)
            .await
            .map_err(|e| match e.downcast::<image::ImageError>() {
                Ok(image_error) => StorageError::DecodeFailed(image_error),
                Err(other) => StorageError::InvalidLocator(format!("{}: {}", locator, other)),
            })
    }

    async fn store(&self, bytes: Vec<u8>, key: &str, content_type: &str) -> StorageResult<String> {
        let bucket = self.config.bucket().to_string();
        debug!(bucket = %bucket, key, bytes = bytes.len(), "Storing image");

        let response = self
            .authorize(
                self.http_client
                    .put(self.object_url(&bucket, key))
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(bytes),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::UnexpectedStatus {
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(format!("s3://{}/{}", bucket, key))
    }
}
