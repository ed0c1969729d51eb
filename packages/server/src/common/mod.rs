// Common types and utilities shared across the application

pub mod app_context;
pub mod types;
pub mod utils;

pub use app_context::AppContext;
pub use types::*;
