use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::{
    db::error::{DbError, DbResult},
    models::Run,
};

#[async_trait]
pub trait RunRepo: Send + Sync {
    /// Insert a new run and return its id.
    ///
    /// Without `run_time` the store's `CURRENT_TIMESTAMP` default is used.
    async fn begin_run(&self, weekday: u32, run_time: Option<NaiveDateTime>) -> DbResult<i64>;

    /// The run with the greatest creation time (ties broken by id).
    async fn latest(&self) -> DbResult<Option<Run>>;

    /// All runs, oldest first.
    async fn list(&self) -> DbResult<Vec<Run>>;

    /// Ids of runs whose calendar date is before `cutoff`, oldest first.
    ///
    /// Rows whose `run_time` is not a valid timestamp are skipped.
    async fn ids_created_before(&self, cutoff: NaiveDate) -> DbResult<Vec<i64>>;

    /// Delete one run. Its orders go with it through the cascading foreign key.
    /// Returns the number of runs deleted (0 or 1).
    async fn delete(&self, id: i64) -> DbResult<u64>;

    async fn count(&self) -> DbResult<i64>;

    /// Id of the newest run, which must be dated today (UTC).
    ///
    /// Returns [`DbError::ClockAnomaly`] when it is not, and
    /// [`DbError::NotFound`] when no run exists.
    async fn current_run_id(&self) -> DbResult<i64> {
        let run = self.latest().await?.ok_or(DbError::NotFound)?;
        ensure_run_is_today(&run, Utc::now().date_naive())?;
        tracing::debug!(run_id = run.id, "Resolved current run");
        Ok(run.id)
    }
}

/// Reject a run that was not created on `today`.
pub fn ensure_run_is_today(run: &Run, today: NaiveDate) -> DbResult<()> {
    let run_date = run.run_date();
    if run_date != today {
        return Err(DbError::ClockAnomaly {
            run_id: run.id,
            run_date,
            today,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_on(date: NaiveDate) -> Run {
        Run {
            id: 7,
            run_time: date.and_hms_opt(0, 0, 1).unwrap(),
            weekday: None,
        }
    }

    #[test]
    fn test_run_dated_today_accepted() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(ensure_run_is_today(&run_on(today), today).is_ok());
    }

    #[test]
    fn test_run_from_yesterday_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let err = ensure_run_is_today(&run_on(yesterday), today).unwrap_err();
        match err {
            DbError::ClockAnomaly {
                run_id,
                run_date,
                today: expected,
            } => {
                assert_eq!(run_id, 7);
                assert_eq!(run_date, yesterday);
                assert_eq!(expected, today);
            }
            other => panic!("expected ClockAnomaly, got {other:?}"),
        }
    }
}
