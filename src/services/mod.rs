mod ingest;
mod ledger;

pub use ingest::{IngestError, IngestReport, IngestStage};
pub use ledger::LedgerService;
