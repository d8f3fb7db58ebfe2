use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use super::common::parse_timestamp;
use crate::{
    db::{error::DbResult, repos::OrderRepo},
    models::{OrderRecord, StoredOrder},
};

pub struct SqliteOrderRepo {
    pool: SqlitePool,
}

impl SqliteOrderRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_order(row: &SqliteRow) -> DbResult<StoredOrder> {
        Ok(StoredOrder {
            order_id: row.get("order_id"),
            purchase_date: row.get("purchase_date"),
            payments_date: row.get("payments_date"),
            buyer_name: row.get("buyer_name"),
            last_update: parse_timestamp(&row.get::<String, _>("last_update"))?,
            date_added: row.get("date_added"),
            run_id: row.get("run"),
        })
    }
}

#[async_trait]
impl OrderRepo for SqliteOrderRepo {
    async fn existing_order_ids(&self) -> DbResult<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT order_id FROM orders")
            .fetch_all(&self.pool)
            .await
            .inspect_err(|e| {
                tracing::error!(severity = "critical", error = %e, "Failed to retrieve order ids from orders table")
            })?;

        tracing::debug!(count = ids.len(), "Orders table currently holds {} entries", ids.len());
        Ok(ids.into_iter().collect())
    }

    async fn insert(&self, order: &OrderRecord, date_added: &str, run_id: i64) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, purchase_date, payments_date, buyer_name, date_added, run)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.order_id)
        .bind(&order.purchase_date)
        .bind(&order.payments_date)
        .bind(order.buyer_name.as_deref())
        .bind(date_added)
        .bind(run_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, order_by_last_update: bool) -> DbResult<Vec<StoredOrder>> {
        let sql = if order_by_last_update {
            r#"
            SELECT order_id, purchase_date, payments_date, buyer_name, last_update, date_added, run
            FROM orders
            ORDER BY last_update DESC, rowid DESC
            "#
        } else {
            r#"
            SELECT order_id, purchase_date, payments_date, buyer_name, last_update, date_added, run
            FROM orders
            ORDER BY rowid ASC
            "#
        };

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to retrieve data from orders table"))?;

        rows.iter().map(Self::parse_order).collect()
    }

    async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_for_run(&self, run_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE run = ?")
            .bind(run_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
