//! Order ledger: remembers which order records earlier runs of an ingestion
//! job already stored, persists new ones grouped by run, flushes old runs and
//! keeps before/after backups of the store around every ingestion.

pub mod config;
pub mod db;
pub mod models;
#[cfg(feature = "cli")]
pub mod observability;
pub mod retention;
pub mod services;
