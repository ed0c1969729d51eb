// Business domains
pub mod tracking;
