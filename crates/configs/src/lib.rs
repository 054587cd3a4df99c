use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const DEFAULT_SECRET_KEY: &str = "change-me-in-production";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            worker_threads: Some(4),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Which blob backend holds the documents. Chosen once at startup.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Local,
    Gcs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub mode: StorageMode,
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    #[serde(default)]
    pub gcs: GcsConfig,
    #[serde(default = "default_registry_key")]
    pub registry_key: String,
    #[serde(default = "default_insights_key")]
    pub insights_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Local,
            local_root: default_local_root(),
            gcs: GcsConfig::default(),
            registry_key: default_registry_key(),
            insights_key: default_insights_key(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GcsConfig {
    #[serde(default)]
    pub bucket: String,
    /// Override for emulators; the public endpoint is used when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Static OAuth token. Without one the metadata server is asked,
    /// unless an endpoint override is set, in which case requests go out anonymous.
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    [
        "http://localhost:5173",
        "http://localhost:5174",
        "http://127.0.0.1:5173",
        "http://127.0.0.1:5174",
        "https://credocarbon.com",
        "https://www.credocarbon.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_local_root() -> PathBuf { PathBuf::from("public/Data") }
fn default_registry_key() -> String { "registry.json".into() }
fn default_insights_key() -> String { "insights.json".into() }
fn default_secret_key() -> String { DEFAULT_SECRET_KEY.into() }
fn default_admin_username() -> String { "admin".into() }
fn default_admin_password() -> String { "changeme".into() }
fn default_token_ttl_minutes() -> i64 { 60 * 24 }

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Load from `CONFIG_PATH` (default `config.toml`). A missing file yields defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !std::path::Path::new(&path).exists() {
        return Ok(AppConfig::default());
    }
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// File, then process environment, then validation.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Apply variable overrides using the given lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(w) = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(flag) = lookup("USE_GCS") {
            self.storage.mode = if parse_flag(&flag) { StorageMode::Gcs } else { StorageMode::Local };
        }
        if let Some(bucket) = lookup("GCS_BUCKET_NAME") {
            self.storage.gcs.bucket = bucket;
        }
        if let Some(endpoint) = lookup("GCS_ENDPOINT") {
            self.storage.gcs.endpoint = Some(endpoint);
        }
        if let Some(token) = lookup("GCS_ACCESS_TOKEN") {
            self.storage.gcs.access_token = Some(token);
        }
        if let Some(root) = lookup("PUBLIC_DATA_DIR") {
            self.storage.local_root = PathBuf::from(root);
        }
        if let Some(key) = lookup("GCS_REGISTRY_FILE") {
            self.storage.registry_key = key;
        }
        if let Some(key) = lookup("GCS_INSIGHTS_FILE") {
            self.storage.insights_key = key;
        }

        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(user) = lookup("ADMIN_USERNAME") {
            self.auth.admin_username = user;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD") {
            self.auth.admin_password = password;
        }
        if let Some(ttl) = lookup("ACCESS_TOKEN_EXPIRE_MINUTES").and_then(|v| v.parse::<i64>().ok()) {
            self.auth.token_ttl_minutes = ttl;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "0.0.0.0".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mode == StorageMode::Gcs && self.gcs.bucket.trim().is_empty() {
            return Err(anyhow!("storage.gcs.bucket is required when storage.mode = \"gcs\" (or set GCS_BUCKET_NAME)"));
        }
        if self.registry_key.trim().is_empty() || self.insights_key.trim().is_empty() {
            return Err(anyhow!("storage document keys must not be empty"));
        }
        if self.registry_key == self.insights_key {
            return Err(anyhow!("storage.registry_key and storage.insights_key must differ"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            return Err(anyhow!("auth.secret_key must not be empty"));
        }
        if self.admin_username.trim().is_empty() {
            return Err(anyhow!("auth.admin_username must not be empty"));
        }
        if self.token_ttl_minutes <= 0 {
            return Err(anyhow!("auth.token_ttl_minutes must be positive"));
        }
        if self.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            return Err(anyhow!(
                "auth.token_ttl_minutes must be at most {MAX_TOKEN_TTL_MINUTES} (one year)"
            ));
        }
        Ok(())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}
