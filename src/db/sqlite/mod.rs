mod backup;
mod common;
mod orders;
mod runs;

pub use backup::SqliteBackupRepo;
pub use common::{SQLITE_TIMESTAMP_FORMAT, format_timestamp, parse_timestamp};
pub use orders::SqliteOrderRepo;
pub use runs::SqliteRunRepo;
