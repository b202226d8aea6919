//! Persistence backends for tracker state.

use crate::state::AppState;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

/// Where the store keeps its state between runs
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Last saved state, `None` if nothing has been saved yet
    async fn load(&self) -> Result<Option<AppState>>;

    async fn save(&self, state: &AppState) -> Result<()>;
}

/// Keeps the serialized state in memory; nothing survives a restart
#[derive(Default)]
pub struct MemoryStorage {
    document: RwLock<Option<Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<AppState>> {
        let document = self.document.read().await;
        document
            .as_deref()
            .map(|bytes| serde_json::from_slice(bytes).map_err(Error::from))
            .transpose()
    }

    async fn save(&self, state: &AppState) -> Result<()> {
        let bytes = serde_json::to_vec(state)?;
        *self.document.write().await = Some(bytes);
        Ok(())
    }
}

/// JSON document on disk.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a crash mid-write leaves the previous document intact.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "state".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStorage for FileStorage {
    async fn load(&self) -> Result<Option<AppState>> {
        match fs::read(&self.path).await {
            Ok(bytes) => {
                debug!("Loaded {} bytes of state from {}", bytes.len(), self.path.display());
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, state: &AppState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, &bytes).await?;
        fs::rename(&temp_path, &self.path).await?;
        debug!("Saved {} bytes of state to {}", bytes.len(), self.path.display());
        Ok(())
    }
}
