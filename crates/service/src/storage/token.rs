//! OAuth bearer tokens for the object storage API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use configs::GcsConfig;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::StoreError;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh tokens this long before the server-side expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Supplies the bearer token for each storage request. `None` means anonymous.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<Option<String>, StoreError>;
}

/// A fixed token, typically from `GCS_ACCESS_TOKEN`.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(Some(self.0.clone()))
    }
}

/// No Authorization header; for emulators.
pub struct Anonymous;

#[async_trait]
impl TokenProvider for Anonymous {
    async fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Token from the compute metadata server, cached until close to expiry.
pub struct MetadataServerToken {
    http: reqwest::Client,
    url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl MetadataServerToken {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_url(http, METADATA_TOKEN_URL)
    }

    pub fn with_url(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into(), cached: Mutex::new(None) }
    }
}

#[async_trait]
impl TokenProvider for MetadataServerToken {
    async fn token(&self) -> Result<Option<String>, StoreError> {
        let mut cached = self.cached.lock().await;
        if let Some(tok) = cached.as_ref() {
            if Instant::now() < tok.refresh_at {
                return Ok(Some(tok.value.clone()));
            }
        }

        let resp = self
            .http
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("metadata token request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(StoreError::Backend(format!(
                "metadata token request returned {}",
                resp.status()
            )));
        }
        let body: MetadataToken = resp
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("metadata token response invalid: {e}")))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_MARGIN);
        debug!(expires_in = body.expires_in, "fetched storage access token");
        *cached = Some(CachedToken {
            value: body.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(Some(body.access_token))
    }
}

/// Static token if configured, anonymous against an emulator endpoint,
/// otherwise the metadata server.
pub fn provider_from_config(cfg: &GcsConfig) -> Arc<dyn TokenProvider> {
    match (&cfg.access_token, &cfg.endpoint) {
        (Some(tok), _) if !tok.is_empty() => Arc::new(StaticToken(tok.clone())),
        (_, Some(_)) => Arc::new(Anonymous),
        _ => Arc::new(MetadataServerToken::new(reqwest::Client::new())),
    }
}
