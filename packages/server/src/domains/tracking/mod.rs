//! Position tracking: line discovery and the per-line pollers.

pub mod discovery;
pub mod poller;

pub use discovery::{start_tracking, TrackerHandle};
pub use poller::{PollOutcome, PositionPoller, DEFAULT_POLL_INTERVAL};
