//! Environment/runtime helpers
//!
//! Sanity checks run once at startup, before the first request is served.

use std::path::Path;

use tracing::warn;

/// Check the local document root.
///
/// Documents are provisioned out-of-band, so a missing root is only
/// reported, never created. Returns whether the directory exists.
pub async fn check_data_root(data_root: &Path) -> anyhow::Result<bool> {
    match tokio::fs::metadata(data_root).await {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => Err(anyhow::anyhow!(
            "data root {} exists but is not a directory",
            data_root.display()
        )),
        Err(_) => {
            warn!(data_root = %data_root.display(), "data root not found; document reads will fail until it is provisioned");
            Ok(false)
        }
    }
}
