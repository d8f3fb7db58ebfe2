use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    db::error::DbResult,
    models::{FailedInsert, InsertSummary, OrderRecord, StoredOrder},
};

#[async_trait]
pub trait OrderRepo: Send + Sync {
    /// Every order id currently stored.
    ///
    /// A failure here is returned as an error, never as an empty set: callers
    /// would otherwise treat every candidate as new.
    async fn existing_order_ids(&self) -> DbResult<HashSet<String>>;

    /// Insert one order under `run_id`.
    ///
    /// Duplicate ids and missing buyer names are rejected by the store.
    async fn insert(&self, order: &OrderRecord, date_added: &str, run_id: i64) -> DbResult<()>;

    /// All stored orders; newest `last_update` first when requested,
    /// otherwise in insertion order.
    async fn list(&self, order_by_last_update: bool) -> DbResult<Vec<StoredOrder>>;

    async fn count(&self) -> DbResult<i64>;

    async fn count_for_run(&self, run_id: i64) -> DbResult<i64>;

    /// Insert every order under `run_id`, one row at a time.
    ///
    /// A rejected row is logged and recorded in the summary; the remaining
    /// rows are still attempted.
    async fn insert_batch(&self, orders: &[OrderRecord], run_id: i64) -> InsertSummary {
        let date_added = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let mut summary = InsertSummary::new(run_id);

        for order in orders {
            match self.insert(order, &date_added, run_id).await {
                Ok(()) => {
                    tracing::debug!(
                        order_id = %order.order_id,
                        run_id,
                        buyer = order.buyer_name.as_deref().unwrap_or_default(),
                        purchase_date = %order.purchase_date,
                        "Order added to database"
                    );
                    summary.inserted.push(order.order_id.clone());
                }
                Err(e) => {
                    if e.is_constraint_violation() {
                        tracing::error!(order_id = %order.order_id, run_id, error = %e, "Order rejected by store constraint");
                    } else {
                        tracing::error!(order_id = %order.order_id, run_id, error = %e, "Unexpected error while inserting order");
                    }
                    summary.failed.push(FailedInsert {
                        order_id: order.order_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            run_id,
            added = summary.inserted.len(),
            failed = summary.failed.len(),
            "{} new orders were added to database at run {}",
            summary.inserted.len(),
            run_id
        );
        summary
    }

    /// Candidates whose id is not yet stored, in input order.
    async fn deduplicate(&self, candidates: Vec<OrderRecord>) -> DbResult<Vec<OrderRecord>> {
        let existing = self.existing_order_ids().await?;
        let loaded = candidates.len();
        let new_orders = filter_new_orders(candidates, &existing);

        tracing::info!(
            new = new_orders.len(),
            loaded,
            stored = existing.len(),
            "Returning {}/{} new/loaded orders for further processing",
            new_orders.len(),
            loaded
        );
        Ok(new_orders)
    }
}

/// Keep the candidates whose id is absent from `existing`.
///
/// Exact membership on the raw id: no trimming or case folding.
pub fn filter_new_orders(
    candidates: Vec<OrderRecord>,
    existing: &HashSet<String>,
) -> Vec<OrderRecord> {
    candidates
        .into_iter()
        .filter(|order| !existing.contains(&order.order_id))
        .collect()
}
