use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::{
    error::{DbError, DbResult},
    repos::BackupRepo,
};

/// Snapshots the live store with `VACUUM INTO`.
///
/// The copy is written next to the destination first and renamed over it once
/// complete, so a failed backup never leaves a truncated file at the
/// destination.
pub struct SqliteBackupRepo {
    pool: SqlitePool,
}

impl SqliteBackupRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn staging_path(destination: &Path) -> DbResult<PathBuf> {
    let file_name = destination.file_name().ok_or_else(|| {
        DbError::Internal(format!(
            "Backup destination has no file name: {}",
            destination.display()
        ))
    })?;
    let mut staged = file_name.to_os_string();
    staged.push(".tmp");
    Ok(destination.with_file_name(staged))
}

async fn remove_if_present(path: &Path) -> DbResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl BackupRepo for SqliteBackupRepo {
    async fn snapshot(&self, destination: &Path) -> DbResult<()> {
        let staged = staging_path(destination)?;

        // VACUUM INTO refuses to overwrite an existing file.
        remove_if_present(&staged).await?;

        let result = sqlx::query("VACUUM INTO ?")
            .bind(staged.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            tracing::error!(
                destination = %destination.display(),
                error = %e,
                "Failed to write database backup"
            );
            let _ = remove_if_present(&staged).await;
            return Err(e.into());
        }

        if let Err(e) = tokio::fs::rename(&staged, destination).await {
            tracing::error!(
                destination = %destination.display(),
                error = %e,
                "Failed to move database backup into place"
            );
            let _ = remove_if_present(&staged).await;
            return Err(e.into());
        }

        tracing::info!(
            destination = %destination.display(),
            completed_at = %Utc::now().format("%Y-%m-%d %H:%M:%S"),
            "Database backed up to {}",
            destination.display()
        );
        Ok(())
    }
}
