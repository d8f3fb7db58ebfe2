//! Observability module providing structured logging.
//!
//! Storage code logs through `tracing` macros; this module only wires up the
//! subscriber for the command-line entry point.

mod tracing_init;

pub use tracing_init::*;
