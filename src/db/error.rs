use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Not found")]
    NotFound,

    /// The newest run is not dated today, so ingesting under it would tag
    /// orders with a stale run.
    #[error("Clock anomaly: newest run {run_id} is dated {run_date}, expected {today}")]
    ClockAnomaly {
        run_id: i64,
        run_date: NaiveDate,
        today: NaiveDate,
    },

    /// Another run became the newest between opening ours and resolving it.
    #[error("Run ordering anomaly: opened run {opened} but newest run is {resolved}")]
    RunMismatch { opened: i64, resolved: i64 },

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DbError {
    /// True for SQLite "table ... already exists" failures.
    pub fn is_already_exists(&self) -> bool {
        match self {
            DbError::Sqlx(sqlx::Error::Database(e)) => e.message().contains("already exists"),
            _ => false,
        }
    }

    /// True for UNIQUE / NOT NULL / FOREIGN KEY violations.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            DbError::Sqlx(sqlx::Error::Database(e)) => {
                e.is_unique_violation()
                    || e.is_foreign_key_violation()
                    || matches!(e.kind(), sqlx::error::ErrorKind::NotNullViolation)
            }
            _ => false,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
