//! Age-based retention for runs.
//!
//! A flush deletes every run older than the configured number of days. Orders
//! are removed by the cascading foreign key on their owning run, never by
//! deleting child rows directly. Deletion goes run by run so one failure does
//! not stop the rest, and a dry-run mode reports what would be deleted.

mod manager;

pub use manager::{FlushResult, RetentionManager, stale_cutoff};
