//! Schema management for the order store.
//!
//! Tables are created with plain `CREATE TABLE` on every open. An existing
//! table makes SQLite reject the statement; that case is logged at debug and
//! skipped, any other failure propagates.

use sqlx::SqlitePool;

use super::error::{DbError, DbResult};

const CREATE_PROGRAM_RUNS: &str = r#"
    CREATE TABLE program_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_time TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        weekday INTEGER
    )
"#;

const CREATE_ORDERS: &str = r#"
    CREATE TABLE orders (
        order_id TEXT PRIMARY KEY,
        purchase_date TEXT,
        payments_date TEXT,
        buyer_name TEXT NOT NULL,
        last_update TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        date_added TEXT NOT NULL,
        run INTEGER NOT NULL,
        FOREIGN KEY (run) REFERENCES program_runs (id) ON DELETE CASCADE
    )
"#;

/// Ensure the `program_runs` and `orders` tables exist.
pub async fn ensure_schema(pool: &SqlitePool) -> DbResult<()> {
    create_table(pool, "program_runs", CREATE_PROGRAM_RUNS).await?;
    create_table(pool, "orders", CREATE_ORDERS).await?;
    tracing::debug!("Database tables are in place and ready to be used");
    Ok(())
}

async fn create_table(pool: &SqlitePool, table: &str, ddl: &str) -> DbResult<()> {
    match sqlx::query(ddl).execute(pool).await.map_err(DbError::from) {
        Ok(_) => {
            tracing::debug!(table, "Created table");
            Ok(())
        }
        Err(e) if e.is_already_exists() => {
            tracing::debug!(table, error = %e, "Table already created");
            Ok(())
        }
        Err(e) => {
            tracing::error!(table, error = %e, "Failed to create table");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::harness::create_sqlite_pool;

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('program_runs', 'orders') ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .expect("Failed to list tables")
    }

    #[tokio::test]
    async fn test_creates_both_tables() {
        let pool = create_sqlite_pool().await;
        ensure_schema(&pool).await.expect("Failed to create schema");
        assert_eq!(table_names(&pool).await, vec!["orders", "program_runs"]);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let pool = create_sqlite_pool().await;
        ensure_schema(&pool).await.expect("First call failed");
        ensure_schema(&pool).await.expect("Second call failed");
        assert_eq!(table_names(&pool).await.len(), 2);
    }

    #[tokio::test]
    async fn test_existing_rows_survive_reopen() {
        let pool = create_sqlite_pool().await;
        ensure_schema(&pool).await.unwrap();
        sqlx::query("INSERT INTO program_runs (weekday) VALUES (1)")
            .execute(&pool)
            .await
            .unwrap();

        ensure_schema(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM program_runs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
