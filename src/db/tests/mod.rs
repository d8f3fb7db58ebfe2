//! Shared database repository test infrastructure
//!
//! Each repository has a test module (e.g., `orders.rs`) containing shared
//! test functions that take `&dyn XxxRepo`, instantiated against in-memory
//! SQLite through a `sqlite_test!` macro.
//!
//! # Running tests
//!
//! ```bash
//! cargo test db::tests
//! ```
