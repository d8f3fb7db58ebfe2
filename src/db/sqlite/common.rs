use chrono::NaiveDateTime;

use crate::db::error::{DbError, DbResult};

/// Format used by SQLite's `CURRENT_TIMESTAMP`.
pub const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp the way SQLite's `CURRENT_TIMESTAMP` writes it, so text
/// ordering on the column stays chronological.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(SQLITE_TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp column, accepting optional fractional seconds and a `T`
/// separator.
pub fn parse_timestamp(s: &str) -> DbResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, SQLITE_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| DbError::Internal(format!("Invalid timestamp in database '{}': {}", s, e)))
}
