//! Google Cloud Storage backend.
//!
//! Reads go through the JSON API in two steps: the object metadata is fetched
//! first to learn the live `generation`, then the media download is pinned to
//! that generation. Content served is therefore never older than the metadata
//! just refreshed, even behind caches. Writes are single-request uploads that
//! replace the object (last writer wins) and mark it uncacheable.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::token::TokenProvider;
use super::BlobBackend;
use crate::errors::StoreError;

pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Metadata-then-download cycles tried before a read gives up.
const READ_ATTEMPTS: u32 = 3;

#[derive(Debug, Deserialize)]
struct ObjectMetadata {
    generation: String,
}

/// HTTP client for the storage API. Constructed once and injected into
/// [`GcsBackend`].
#[derive(Clone)]
pub struct GcsClient {
    http: reqwest::Client,
    endpoint: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl GcsClient {
    pub fn new(endpoint: Option<&str>, tokens: Arc<dyn TokenProvider>) -> Result<Self, StoreError> {
        Self::with_http(reqwest::Client::new(), endpoint, tokens)
    }

    pub fn with_http(
        http: reqwest::Client,
        endpoint: Option<&str>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, StoreError> {
        let raw = endpoint.unwrap_or(DEFAULT_ENDPOINT);
        let endpoint = Url::parse(raw)
            .map_err(|e| StoreError::Backend(format!("invalid storage endpoint {raw:?}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::Backend(format!("invalid storage endpoint {raw:?}")));
        }
        Ok(Self { http, endpoint, tokens })
    }

    /// `{endpoint}/storage/v1/b/{bucket}/o/{object}` with the object name as
    /// one encoded segment.
    fn object_url(&self, bucket: &str, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["storage", "v1", "b", bucket, "o"]).push(key);
        }
        url
    }

    /// `{endpoint}/{bucket}/{object}` for single-request uploads.
    fn upload_url(&self, bucket: &str, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(bucket).extend(key.split('/'));
        }
        url
    }

    async fn authorize(&self, req: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        Ok(match self.tokens.token().await? {
            Some(token) => req.bearer_auth(token),
            None => req,
        })
    }

    async fn send(&self, req: RequestBuilder, bucket: &str, key: &str) -> Result<Response, StoreError> {
        let resp = self
            .authorize(req)
            .await?
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("gs://{bucket}/{key}: {e}")))?;
        match resp.status() {
            s if s.is_success() => Ok(resp),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound { key: format!("gs://{bucket}/{key}") }),
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(StoreError::Backend(format!("gs://{bucket}/{key}: HTTP {s}: {body}")))
            }
        }
    }

    /// Fetch fresh object metadata and return the live generation.
    pub async fn object_generation(&self, bucket: &str, key: &str) -> Result<String, StoreError> {
        let req = self.http.get(self.object_url(bucket, key));
        let meta: ObjectMetadata = self
            .send(req, bucket, key)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("gs://{bucket}/{key}: bad metadata: {e}")))?;
        Ok(meta.generation)
    }

    /// Download the content of one specific generation.
    pub async fn download(&self, bucket: &str, key: &str, generation: &str) -> Result<Vec<u8>, StoreError> {
        let req = self
            .http
            .get(self.object_url(bucket, key))
            .query(&[("alt", "media"), ("generation", generation)]);
        let bytes = self
            .send(req, bucket, key)
            .await?
            .bytes()
            .await
            .map_err(|e| StoreError::Backend(format!("gs://{bucket}/{key}: {e}")))?;
        Ok(bytes.to_vec())
    }

    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        cache_control: &str,
    ) -> Result<(), StoreError> {
        let req = self
            .http
            .put(self.upload_url(bucket, key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CACHE_CONTROL, cache_control)
            .body(bytes);
        self.send(req, bucket, key).await?;
        Ok(())
    }
}

/// Documents stored as JSON objects in one bucket.
pub struct GcsBackend {
    client: GcsClient,
    bucket: String,
}

impl GcsBackend {
    pub fn new(client: GcsClient, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Only a 404 on the metadata call means the object is absent. A 404 on
    /// the pinned download means a newer generation replaced the one just
    /// seen, so the cycle starts over.
    async fn read_fresh(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        for attempt in 1..=READ_ATTEMPTS {
            let generation = self.client.object_generation(&self.bucket, key).await?;
            match self.client.download(&self.bucket, key, &generation).await {
                Ok(bytes) => {
                    debug!(bucket = %self.bucket, key, %generation, bytes = bytes.len(), "gcs read");
                    return Ok(bytes);
                }
                Err(StoreError::NotFound { .. }) => {
                    warn!(bucket = %self.bucket, key, %generation, attempt, "generation replaced during read");
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Backend(format!(
            "gs://{}/{key}: object kept changing during {READ_ATTEMPTS} read attempts",
            self.bucket
        )))
    }
}

#[async_trait]
impl BlobBackend for GcsBackend {
    fn describe(&self) -> String {
        format!("gs://{}", self.bucket)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let result = self.read_fresh(key).await;
        if let Err(e @ StoreError::Backend(_)) = &result {
            error!(bucket = %self.bucket, key, err = %e, "gcs read failed");
        }
        result
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let len = bytes.len();
        match self.client.upload(&self.bucket, key, bytes, "application/json", NO_CACHE).await {
            Ok(()) => {
                debug!(bucket = %self.bucket, key, bytes = len, "gcs write");
                Ok(())
            }
            // a 404 on upload means the bucket itself is missing
            Err(StoreError::NotFound { key }) => {
                error!(bucket = %self.bucket, %key, "gcs write failed: bucket not found");
                Err(StoreError::Backend(format!("bucket not found while writing {key}")))
            }
            Err(e) => {
                error!(bucket = %self.bucket, key, err = %e, "gcs write failed");
                Err(e)
            }
        }
    }
}
