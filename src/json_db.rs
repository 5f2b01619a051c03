use crate::error::{Result, ScannerError};
use crate::storage::StateStore;
use crate::types::ScanState;
use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Scan state kept in a single JSON document on disk.
pub struct JsonStateStore {
    file_path: PathBuf,
}

impl JsonStateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "db.json".into());
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn init(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    ScannerError::Persistence(format!("Failed to create data directory: {}", e))
                })?;
            }
        }
        Ok(())
    }

    async fn load(&self) -> Result<Option<ScanState>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path)
            .await
            .map_err(|e| ScannerError::Persistence(format!("Failed to read state file: {}", e)))?;

        let state: ScanState = serde_json::from_str(&content).map_err(|e| {
            ScannerError::Persistence(format!(
                "Failed to parse state file {}: {}",
                self.file_path.display(),
                e
            ))
        })?;

        info!(
            "Loaded state from {}: {} results, resume point {:?}",
            self.file_path.display(),
            state.results.len(),
            state.last_scanned_item_id
        );
        Ok(Some(state))
    }

    async fn save(&self, state: &ScanState) -> Result<()> {
        let temp_path = self.temp_path();
        let json = serde_json::to_string_pretty(state)?;

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            ScannerError::Persistence(format!("Failed to create temp file: {}", e))
        })?;

        file.write_all(json.as_bytes()).await.map_err(|e| {
            ScannerError::Persistence(format!("Failed to write to temp file: {}", e))
        })?;

        file.flush()
            .await
            .map_err(|e| ScannerError::Persistence(format!("Failed to flush temp file: {}", e)))?;

        fs::rename(&temp_path, &self.file_path)
            .await
            .map_err(|e| ScannerError::Persistence(format!("Failed to rename temp file: {}", e)))?;

        Ok(())
    }
}
