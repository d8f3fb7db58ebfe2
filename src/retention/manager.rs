use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime, Utc};

use crate::{
    config::RetentionConfig,
    db::{DbResult, OrderRepo, OrderStore, RunRepo},
};

/// Outcome of a single flush.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FlushResult {
    /// Runs past the age threshold when the flush started.
    pub stale_runs: Vec<i64>,
    /// Runs actually deleted.
    pub deleted_runs: Vec<i64>,
    /// Runs whose deletion failed; they stay in the store.
    pub failed_runs: Vec<i64>,
    /// Orders removed through the cascade.
    pub orders_deleted: i64,
    pub dry_run: bool,
}

impl FlushResult {
    /// Check if any runs were deleted.
    pub fn has_deletions(&self) -> bool {
        !self.deleted_runs.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_runs.is_empty()
    }
}

/// First calendar date that is still kept.
///
/// A run's age is the number of calendar days between its date and `now`'s
/// date, regardless of time of day. Runs whose age is greater than
/// `max_age_days`, i.e. dated before the cutoff, are stale.
pub fn stale_cutoff(now: NaiveDateTime, max_age_days: u32) -> NaiveDate {
    now.date()
        .checked_sub_days(Days::new(u64::from(max_age_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Finds and deletes stale runs.
pub struct RetentionManager {
    runs: Arc<dyn RunRepo>,
    orders: Arc<dyn OrderRepo>,
    dry_run: bool,
}

impl RetentionManager {
    pub fn new(store: &OrderStore) -> Self {
        Self {
            runs: store.runs(),
            orders: store.orders(),
            dry_run: false,
        }
    }

    /// Manager honouring the configured dry-run switch.
    pub fn from_config(store: &OrderStore, config: &RetentionConfig) -> Self {
        Self::new(store).with_dry_run(config.dry_run)
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Ids of runs older than `max_age_days`, measured from now.
    pub async fn find_stale_runs(&self, max_age_days: u32) -> DbResult<Vec<i64>> {
        self.find_stale_runs_at(max_age_days, Utc::now().naive_utc())
            .await
    }

    /// Ids of runs older than `max_age_days`, measured from `now`.
    pub async fn find_stale_runs_at(
        &self,
        max_age_days: u32,
        now: NaiveDateTime,
    ) -> DbResult<Vec<i64>> {
        let cutoff = stale_cutoff(now, max_age_days);
        let stale = self.runs.ids_created_before(cutoff).await?;

        tracing::debug!(
            ?stale,
            max_age_days,
            %cutoff,
            "Identified old run ids, added more than {} days ago",
            max_age_days
        );
        Ok(stale)
    }

    /// Delete every run older than `max_age_days` together with its orders.
    pub async fn flush(&self, max_age_days: u32) -> DbResult<FlushResult> {
        self.flush_at(max_age_days, Utc::now().naive_utc()).await
    }

    /// [`flush`](Self::flush) measured from `now`.
    ///
    /// Only finding the stale runs can fail the flush. A failed delete is
    /// logged, recorded in [`FlushResult::failed_runs`], and the remaining
    /// runs are still attempted.
    pub async fn flush_at(&self, max_age_days: u32, now: NaiveDateTime) -> DbResult<FlushResult> {
        let stale_runs = self.find_stale_runs_at(max_age_days, now).await?;
        let mut result = FlushResult {
            stale_runs: stale_runs.clone(),
            dry_run: self.dry_run,
            ..Default::default()
        };

        if self.dry_run {
            tracing::info!(
                runs = ?stale_runs,
                max_age_days,
                "DRY RUN: Would delete {} runs older than {} days",
                stale_runs.len(),
                max_age_days
            );
            return Ok(result);
        }

        for run_id in stale_runs {
            // Counted up front; the cascade gives no row count back.
            let orders = match self.orders.count_for_run(run_id).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::error!(run_id, error = %e, "Failed to count orders of stale run");
                    0
                }
            };

            match self.runs.delete(run_id).await {
                Ok(0) => {
                    tracing::debug!(run_id, "Run already gone before deletion");
                }
                Ok(_) => {
                    result.deleted_runs.push(run_id);
                    result.orders_deleted += orders;
                }
                Err(e) => {
                    tracing::error!(run_id, error = %e, "Run could not be deleted");
                    result.failed_runs.push(run_id);
                }
            }
        }

        if result.has_deletions() || !result.is_complete() {
            tracing::info!(
                deleted = ?result.deleted_runs,
                failed = ?result.failed_runs,
                orders_deleted = result.orders_deleted,
                "Deleted old orders (cascade) from orders table for runs {:?}",
                result.deleted_runs
            );
        } else {
            tracing::debug!("Retention run complete, no runs to delete");
        }

        Ok(result)
    }
}
