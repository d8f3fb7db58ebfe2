use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use super::common::{format_timestamp, parse_timestamp};
use crate::{
    db::{error::DbResult, repos::RunRepo},
    models::Run,
};

pub struct SqliteRunRepo {
    pool: SqlitePool,
}

impl SqliteRunRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_run(row: &SqliteRow) -> DbResult<Run> {
        let weekday: Option<i64> = row.get("weekday");
        Ok(Run {
            id: row.get("id"),
            run_time: parse_timestamp(&row.get::<String, _>("run_time"))?,
            weekday: weekday.and_then(|d| u32::try_from(d).ok()),
        })
    }
}

#[async_trait]
impl RunRepo for SqliteRunRepo {
    async fn begin_run(&self, weekday: u32, run_time: Option<NaiveDateTime>) -> DbResult<i64> {
        let result = match run_time {
            None => {
                sqlx::query("INSERT INTO program_runs (weekday) VALUES (?)")
                    .bind(weekday)
                    .execute(&self.pool)
                    .await
            }
            Some(ts) => {
                sqlx::query("INSERT INTO program_runs (run_time, weekday) VALUES (?, ?)")
                    .bind(format_timestamp(ts))
                    .bind(weekday)
                    .execute(&self.pool)
                    .await
            }
        };

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                match run_time {
                    None => tracing::debug!(run_id = id, weekday, "Added new run"),
                    Some(ts) => tracing::debug!(
                        run_id = id,
                        weekday,
                        run_time = %format_timestamp(ts),
                        "Added new run with explicit run time"
                    ),
                }
                Ok(id)
            }
            Err(e) => {
                tracing::error!(severity = "critical", weekday, error = %e, "Failed to insert new run");
                Err(e.into())
            }
        }
    }

    async fn latest(&self) -> DbResult<Option<Run>> {
        let row = sqlx::query(
            r#"
            SELECT id, run_time, weekday
            FROM program_runs
            ORDER BY run_time DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch current run"))?;

        row.as_ref().map(Self::parse_run).transpose()
    }

    async fn list(&self) -> DbResult<Vec<Run>> {
        let rows = sqlx::query(
            r#"
            SELECT id, run_time, weekday
            FROM program_runs
            ORDER BY run_time ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to retrieve runs"))?;

        rows.iter().map(Self::parse_run).collect()
    }

    async fn ids_created_before(&self, cutoff: NaiveDate) -> DbResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM program_runs
            WHERE date(run_time) < date(?)
            ORDER BY run_time ASC, id ASC
            "#,
        )
        .bind(cutoff.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to retrieve ids from program_runs table"))?;

        // date() yields NULL for text it cannot read, which the filter drops.
        let unreadable: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM program_runs WHERE date(run_time) IS NULL")
                .fetch_one(&self.pool)
                .await?;
        if unreadable > 0 {
            tracing::warn!(unreadable, "Skipped runs with an unreadable run_time");
        }

        Ok(ids)
    }

    async fn delete(&self, id: i64) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM program_runs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM program_runs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
