use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Storage configuration.
///
/// The output directory holds three files with fixed base names: the live
/// order store, the snapshot taken before a run mutates it, and the snapshot
/// taken after.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding the live store and both backups.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File name of the live store.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// File name of the snapshot taken before a run.
    #[serde(default = "default_backup_before_file")]
    pub backup_before_file: String,

    /// File name of the snapshot taken after a run.
    #[serde(default = "default_backup_after_file")]
    pub backup_after_file: String,

    /// Create the database file if it doesn't exist.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            database_file: default_database_file(),
            backup_before_file: default_backup_before_file(),
            backup_after_file: default_backup_after_file(),
            create_if_missing: true,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `output_dir` with default file names.
    pub fn in_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.output_dir.join(&self.database_file)
    }

    pub fn backup_before_path(&self) -> PathBuf {
        self.output_dir.join(&self.backup_before_file)
    }

    pub fn backup_after_path(&self) -> PathBuf {
        self.output_dir.join(&self.backup_after_file)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("database_file", &self.database_file),
            ("backup_before_file", &self.backup_before_file),
            ("backup_after_file", &self.backup_after_file),
        ];

        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "storage.{field} cannot be empty"
                )));
            }
        }

        if self.database_file == self.backup_before_file
            || self.database_file == self.backup_after_file
            || self.backup_before_file == self.backup_after_file
        {
            return Err(ConfigError::Validation(
                "storage file names must be distinct so backups never overwrite the live store"
                    .into(),
            ));
        }

        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_database_file() -> String {
    "amzn_orders.db".to_string()
}

fn default_backup_before_file() -> String {
    "amzn_orders_b4lrun.db".to_string()
}

fn default_backup_after_file() -> String {
    "amzn_orders_lrun.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout() -> u64 {
    5000 // 5 seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = StorageConfig::in_dir("/data");
        assert_eq!(config.database_path(), PathBuf::from("/data/amzn_orders.db"));
        assert_eq!(
            config.backup_before_path(),
            PathBuf::from("/data/amzn_orders_b4lrun.db")
        );
        assert_eq!(
            config.backup_after_path(),
            PathBuf::from("/data/amzn_orders_lrun.db")
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let config = StorageConfig {
            backup_before_file: "  ".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backup_before_file"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = StorageConfig {
            backup_before_file: "same.db".into(),
            backup_after_file: "same.db".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
