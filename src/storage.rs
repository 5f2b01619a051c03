use crate::error::Result;
use crate::types::ScanState;
use async_trait::async_trait;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Initialize the storage (e.g. ensure the parent directory exists)
    async fn init(&self) -> Result<()>;

    /// Load the persisted scan state, `None` if nothing has been written yet
    async fn load(&self) -> Result<Option<ScanState>>;

    /// Overwrite the persisted scan state (last write wins)
    async fn save(&self, state: &ScanState) -> Result<()>;
}
