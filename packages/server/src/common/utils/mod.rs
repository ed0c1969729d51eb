pub mod humanize;

pub use humanize::*;
