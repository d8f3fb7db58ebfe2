use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// One execution of the ingestion job; the grouping and retention unit for
/// orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Run {
    /// Auto-assigned, monotonically increasing
    pub id: i64,
    /// Creation time (UTC)
    pub run_time: NaiveDateTime,
    /// ISO weekday, Monday = 1 .. Sunday = 7
    pub weekday: Option<u32>,
}

impl Run {
    /// Calendar date the run was created on.
    pub fn run_date(&self) -> NaiveDate {
        self.run_time.date()
    }
}

/// ISO weekday number for a date: Monday = 1 .. Sunday = 7.
pub fn weekday_number(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// Weekday number for the current UTC date, evaluated on every call.
pub fn today_weekday() -> u32 {
    weekday_number(Utc::now().date_naive())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::monday(2024, 1, 1, 1)]
    #[case::wednesday(2024, 1, 3, 3)]
    #[case::saturday(2024, 1, 6, 6)]
    #[case::sunday(2024, 1, 7, 7)]
    fn test_weekday_number(#[case] y: i32, #[case] m: u32, #[case] d: u32, #[case] expected: u32) {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(weekday_number(date), expected);
    }

    #[test]
    fn test_today_weekday_in_range() {
        assert!((1..=7).contains(&today_weekday()));
    }

    #[test]
    fn test_run_date() {
        let run = Run {
            id: 1,
            run_time: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap(),
            weekday: Some(1),
        };
        assert_eq!(run.run_date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }
}
