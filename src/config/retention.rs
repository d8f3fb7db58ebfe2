//! Run retention configuration.
//!
//! Runs older than `archive_days` are flushed at the end of every ingestion,
//! taking their orders with them.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! enabled = true
//! archive_days = 14
//! dry_run = false
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Run retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Whether ingestion flushes stale runs.
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Runs whose age in whole days is strictly greater than this are flushed.
    /// Default: 14
    #[serde(default = "default_archive_days")]
    pub archive_days: u32,

    /// If true, log what would be deleted without actually deleting.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            archive_days: default_archive_days(),
            dry_run: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_archive_days() -> u32 {
    14
}

impl RetentionConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        // i64 day arithmetic downstream; anything this large is a typo.
        if self.archive_days > 36_500 {
            return Err(ConfigError::Validation(format!(
                "retention.archive_days must be at most 36500, got {}",
                self.archive_days
            )));
        }
        Ok(())
    }
}
