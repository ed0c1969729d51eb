// Bus Position Tracker - Core
//
// Polls the transit operator for live bus positions on every line, stores the
// positions it has not seen before, and serves read-only reporting endpoints.
//
// Storage is pluggable (day-partitioned CSV files or PostgreSQL) behind the
// `BasePositionStore` trait; the polling loop is shared by both.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;
pub mod storage;

pub use config::*;
