use std::{fmt, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::{db::DbError, models::InsertSummary, retention::FlushResult};

/// Progress of one run ingestion. Stages are reached strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Idle,
    BackedUpBefore,
    RunOpened,
    OrdersInserted,
    Flushed,
    BackedUpAfter,
    Closed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Idle => "idle",
            IngestStage::BackedUpBefore => "backed_up_before",
            IngestStage::RunOpened => "run_opened",
            IngestStage::OrdersInserted => "orders_inserted",
            IngestStage::Flushed => "flushed",
            IngestStage::BackedUpAfter => "backed_up_after",
            IngestStage::Closed => "closed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed ingestion did.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: i64,
    pub insert: InsertSummary,
    /// `None` when retention is disabled.
    pub flush: Option<FlushResult>,
    pub backup_before: PathBuf,
    pub backup_after: PathBuf,
    pub stage: IngestStage,
}

impl IngestReport {
    /// True when every order was stored and every stale run was deleted.
    pub fn is_complete(&self) -> bool {
        self.insert.is_complete() && self.flush.as_ref().is_none_or(FlushResult::is_complete)
    }
}

/// An ingestion that stopped early. Effects of the stages already reached
/// remain on disk.
#[derive(Debug, Error)]
#[error("Run ingestion failed after stage '{reached}': {source}")]
pub struct IngestError {
    /// Last stage completed before the failure.
    pub reached: IngestStage,
    #[source]
    pub source: DbError,
}

impl IngestError {
    pub(crate) fn after(reached: IngestStage) -> impl FnOnce(DbError) -> IngestError {
        move |source| IngestError { reached, source }
    }
}
