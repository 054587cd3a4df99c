use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, error};

use super::BlobBackend;
use crate::errors::StoreError;

/// Documents stored as files under a fixed root directory.
///
/// Files are written pretty-printed with 4-space indentation. A write goes to
/// a sibling temp file first and is renamed over the target, so readers see
/// either the old or the new content, never a torn file.
#[derive(Debug, Clone)]
pub struct LocalFsBackend {
    root: PathBuf,
}

impl LocalFsBackend {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, refusing keys that could escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(key);
        let escapes = key.is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(StoreError::Backend(format!("invalid document key: {key:?}")));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobBackend for LocalFsBackend {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn json_indent(&self) -> usize {
        4
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(key)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound { key: path.display().to_string() })
            }
            Err(e) => {
                error!(path = %path.display(), err = %e, "local read failed");
                return Err(StoreError::Backend(format!("read {}: {e}", path.display())));
            }
        };
        std::str::from_utf8(&bytes)
            .map_err(|e| StoreError::Parse(format!("{} is not valid UTF-8: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = bytes.len(), "local read");
        Ok(bytes)
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(format!("create {}: {e}", parent.display())))?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, &bytes).await {
            error!(path = %tmp.display(), err = %e, "local write failed");
            return Err(StoreError::Backend(format!("write {}: {e}", tmp.display())));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            error!(path = %path.display(), err = %e, "local rename failed");
            return Err(StoreError::Backend(format!("replace {}: {e}", path.display())));
        }
        debug!(path = %path.display(), bytes = bytes.len(), "local write");
        Ok(())
    }
}
