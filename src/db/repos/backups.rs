use std::path::Path;

use async_trait::async_trait;

use crate::db::error::DbResult;

#[async_trait]
pub trait BackupRepo: Send + Sync {
    /// Write a consistent, standalone copy of the live store to `destination`,
    /// replacing any previous file there.
    async fn snapshot(&self, destination: &Path) -> DbResult<()>;
}
