use std::path::Path;

use super::ingest::{IngestError, IngestReport, IngestStage};
use crate::{
    config::LedgerConfig,
    db::{DbError, DbResult, OrderStore},
    models::{OrderRecord, StoredOrder, today_weekday},
    retention::{FlushResult, RetentionManager},
};

/// Entry point for the ledger's operations.
///
/// Each operation consumes the service and closes the store when it
/// finishes, whether it succeeded or not. Open a new service per operation.
pub struct LedgerService {
    store: OrderStore,
    config: LedgerConfig,
}

impl LedgerService {
    /// Open the store described by `config.storage`.
    pub async fn open(config: LedgerConfig) -> DbResult<Self> {
        let store = OrderStore::open(&config.storage).await?;
        Ok(Self::new(store, config))
    }

    pub fn new(store: OrderStore, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    /// Release the store without running an operation.
    pub async fn close(self) {
        self.store.close().await;
    }

    /// Deduplication query: the candidates not yet stored, in input order.
    pub async fn new_orders_only(self, candidates: Vec<OrderRecord>) -> DbResult<Vec<OrderRecord>> {
        let result = self.store.orders().deduplicate(candidates).await;
        self.store.close().await;
        result
    }

    /// Run ingestion: back up, open a run, insert the orders under it, flush
    /// stale runs, back up again.
    ///
    /// `orders` are expected to be deduplicated already; stored ids are
    /// rejected per row and reported in the summary.
    pub async fn ingest(self, orders: &[OrderRecord]) -> Result<IngestReport, IngestError> {
        let outcome = self.run_stages(orders).await;
        self.store.close().await;

        match outcome {
            Ok(mut report) => {
                report.stage = IngestStage::Closed;
                tracing::info!(
                    run_id = report.run_id,
                    inserted = report.insert.inserted.len(),
                    failed = report.insert.failed.len(),
                    complete = report.is_complete(),
                    "Run ingestion finished"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(stage = %e.reached, error = %e.source, "Run ingestion aborted");
                Err(e)
            }
        }
    }

    async fn run_stages(&self, orders: &[OrderRecord]) -> Result<IngestReport, IngestError> {
        let storage = &self.config.storage;
        let backup_before = storage.backup_before_path();
        let backup_after = storage.backup_after_path();

        self.store
            .backups()
            .snapshot(&backup_before)
            .await
            .map_err(IngestError::after(IngestStage::Idle))?;
        tracing::debug!(stage = %IngestStage::BackedUpBefore, "Ingestion stage reached");

        let runs = self.store.runs();
        let opened = runs
            .begin_run(today_weekday(), None)
            .await
            .map_err(IngestError::after(IngestStage::BackedUpBefore))?;
        let run_id = runs
            .current_run_id()
            .await
            .map_err(IngestError::after(IngestStage::BackedUpBefore))?;
        if run_id != opened {
            return Err(IngestError::after(IngestStage::BackedUpBefore)(
                DbError::RunMismatch {
                    opened,
                    resolved: run_id,
                },
            ));
        }
        tracing::debug!(stage = %IngestStage::RunOpened, run_id, "Ingestion stage reached");

        let insert = self.store.orders().insert_batch(orders, run_id).await;
        tracing::debug!(stage = %IngestStage::OrdersInserted, run_id, "Ingestion stage reached");

        let retention = &self.config.retention;
        let flush = if retention.enabled {
            let result = RetentionManager::from_config(&self.store, retention)
                .flush(retention.archive_days)
                .await
                .map_err(IngestError::after(IngestStage::OrdersInserted))?;
            Some(result)
        } else {
            tracing::debug!("Retention disabled by configuration");
            None
        };
        tracing::debug!(stage = %IngestStage::Flushed, run_id, "Ingestion stage reached");

        self.store
            .backups()
            .snapshot(&backup_after)
            .await
            .map_err(IngestError::after(IngestStage::Flushed))?;
        tracing::debug!(stage = %IngestStage::BackedUpAfter, run_id, "Ingestion stage reached");

        Ok(IngestReport {
            run_id,
            insert,
            flush,
            backup_before,
            backup_after,
            stage: IngestStage::BackedUpAfter,
        })
    }

    /// The orders table, newest `last_update` first when requested.
    pub async fn list_orders(self, order_by_last_update: bool) -> DbResult<Vec<StoredOrder>> {
        let result = self.store.orders().list(order_by_last_update).await;
        self.store.close().await;
        result
    }

    /// On-demand retention pass. `max_age_days` defaults to the configured
    /// archive age; `dry_run` is combined with the configured switch.
    pub async fn flush(self, max_age_days: Option<u32>, dry_run: bool) -> DbResult<FlushResult> {
        let retention = &self.config.retention;
        let result = RetentionManager::new(&self.store)
            .with_dry_run(dry_run || retention.dry_run)
            .flush(max_age_days.unwrap_or(retention.archive_days))
            .await;
        self.store.close().await;
        result
    }

    /// One-off snapshot to `destination`.
    pub async fn backup(self, destination: &Path) -> DbResult<()> {
        let result = self.store.backups().snapshot(destination).await;
        self.store.close().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use tempfile::TempDir;

    use super::*;
    use crate::{
        config::StorageConfig,
        db::tests::harness::{insert_run_at, now_utc},
    };

    fn config_in(dir: &TempDir) -> LedgerConfig {
        LedgerConfig {
            storage: StorageConfig::in_dir(dir.path()),
            ..Default::default()
        }
    }

    fn order(id: &str) -> OrderRecord {
        OrderRecord::new(id, "2024-01-01", "2024-01-02", "Bob")
    }

    async fn count_orders_in(path: &Path) -> i64 {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().filename(path).read_only(true))
            .await
            .expect("Failed to open database file");
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .expect("Failed to count orders");
        pool.close().await;
        count
    }

    #[tokio::test]
    async fn test_ingest_then_dedup() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let report = LedgerService::open(config.clone())
            .await
            .unwrap()
            .ingest(&[order("A1")])
            .await
            .expect("Ingestion failed");
        assert_eq!(report.stage, IngestStage::Closed);
        assert_eq!(report.insert.inserted, vec!["A1"]);
        assert!(report.is_complete());

        let ledger = LedgerService::open(config.clone()).await.unwrap();
        assert_eq!(ledger.store().runs().count().await.unwrap(), 1);
        assert_eq!(ledger.store().orders().count().await.unwrap(), 1);

        let fresh = ledger
            .new_orders_only(vec![order("A1"), order("A2")])
            .await
            .unwrap();
        let ids: Vec<_> = fresh.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["A2"]);
    }

    #[tokio::test]
    async fn test_ingest_brackets_mutation_with_backups() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        LedgerService::open(config.clone())
            .await
            .unwrap()
            .ingest(&[order("A1")])
            .await
            .unwrap();
        let report = LedgerService::open(config.clone())
            .await
            .unwrap()
            .ingest(&[order("B1"), order("B2")])
            .await
            .unwrap();

        assert!(report.backup_before.exists());
        assert!(report.backup_after.exists());
        assert_eq!(count_orders_in(&report.backup_before).await, 1);
        assert_eq!(count_orders_in(&report.backup_after).await, 3);
        assert_eq!(count_orders_in(&config.storage.database_path()).await, 3);
    }

    #[tokio::test]
    async fn test_ingest_reports_rejected_rows() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let nameless = OrderRecord {
            buyer_name: None,
            ..order("X1")
        };

        let report = LedgerService::open(config)
            .await
            .unwrap()
            .ingest(&[order("A1"), nameless])
            .await
            .unwrap();

        assert_eq!(report.insert.inserted, vec!["A1"]);
        assert_eq!(report.insert.failed[0].order_id, "X1");
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_ingest_flushes_stale_runs() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let ledger = LedgerService::open(config.clone()).await.unwrap();
        let old = insert_run_at(ledger.store().pool(), now_utc() - Duration::days(20)).await;
        ledger.store().orders().insert_batch(&[order("OLD")], old).await;

        let report = ledger.ingest(&[order("NEW")]).await.unwrap();

        let flush = report.flush.expect("Retention should have run");
        assert_eq!(flush.deleted_runs, vec![old]);
        assert_eq!(flush.orders_deleted, 1);
        // The pre-run backup still holds the flushed order.
        assert_eq!(count_orders_in(&report.backup_before).await, 1);
        assert_eq!(count_orders_in(&report.backup_after).await, 1);
    }

    #[tokio::test]
    async fn test_ingest_reports_run_that_could_not_be_flushed() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let ledger = LedgerService::open(config).await.unwrap();
        let locked = insert_run_at(ledger.store().pool(), now_utc() - Duration::days(30)).await;
        let free = insert_run_at(ledger.store().pool(), now_utc() - Duration::days(20)).await;
        sqlx::query(&format!(
            "CREATE TRIGGER keep_run BEFORE DELETE ON program_runs WHEN OLD.id = {locked} \
             BEGIN SELECT RAISE(ABORT, 'run is locked'); END"
        ))
        .execute(ledger.store().pool())
        .await
        .unwrap();

        let report = ledger.ingest(&[order("NEW")]).await.unwrap();

        let flush = report.flush.as_ref().expect("Retention should have run");
        assert_eq!(flush.failed_runs, vec![locked]);
        assert_eq!(flush.deleted_runs, vec![free]);
        assert!(report.insert.is_complete());
        assert!(!report.is_complete());
        assert!(report.backup_after.exists());
    }

    #[tokio::test]
    async fn test_ingest_with_retention_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.retention.enabled = false;

        let ledger = LedgerService::open(config).await.unwrap();
        insert_run_at(ledger.store().pool(), now_utc() - Duration::days(20)).await;

        let report = ledger.ingest(&[order("NEW")]).await.unwrap();
        assert!(report.flush.is_none());
        assert_eq!(count_orders_in(&report.backup_after).await, 1);
    }

    #[tokio::test]
    async fn test_ingest_fails_when_backup_cannot_be_written() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.storage.backup_before_file = "missing/b4.db".into();

        let err = LedgerService::open(config.clone())
            .await
            .unwrap()
            .ingest(&[order("A1")])
            .await
            .expect_err("Backup into a missing directory should fail");
        assert_eq!(err.reached, IngestStage::Idle);

        // Nothing was mutated.
        assert_eq!(count_orders_in(&config.storage.database_path()).await, 0);
    }

    #[tokio::test]
    async fn test_ingest_aborts_on_stale_current_run() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        // A run stamped in the future outranks the one ingestion opens.
        let ledger = LedgerService::open(config.clone()).await.unwrap();
        insert_run_at(ledger.store().pool(), now_utc() + Duration::days(2)).await;

        let err = ledger.ingest(&[order("A1")]).await.unwrap_err();
        assert_eq!(err.reached, IngestStage::BackedUpBefore);
        assert!(matches!(err.source, DbError::ClockAnomaly { .. }));

        assert!(config.storage.backup_before_path().exists());
        assert!(!config.storage.backup_after_path().exists());
        assert_eq!(count_orders_in(&config.storage.database_path()).await, 0);
    }

    #[tokio::test]
    async fn test_flush_dry_run_from_service() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let ledger = LedgerService::open(config.clone()).await.unwrap();
        let old = insert_run_at(ledger.store().pool(), now_utc() - Duration::days(20)).await;
        let result = ledger.flush(None, true).await.unwrap();
        assert_eq!(result.stale_runs, vec![old]);
        assert!(result.dry_run);

        let result = LedgerService::open(config.clone())
            .await
            .unwrap()
            .flush(Some(30), false)
            .await
            .unwrap();
        assert!(result.stale_runs.is_empty());
    }

    #[tokio::test]
    async fn test_list_and_backup() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        LedgerService::open(config.clone())
            .await
            .unwrap()
            .ingest(&[order("A1"), order("A2")])
            .await
            .unwrap();

        let listed = LedgerService::open(config.clone())
            .await
            .unwrap()
            .list_orders(true)
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);

        let destination = dir.path().join("manual.db");
        LedgerService::open(config)
            .await
            .unwrap()
            .backup(&destination)
            .await
            .unwrap();
        assert_eq!(count_orders_in(&destination).await, 2);
    }
}
