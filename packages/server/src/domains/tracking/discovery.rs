//! Line discovery: fetch the operator's lines once and start a poller per line.
//!
//! Discovery is never retried. If the line list cannot be fetched the failure
//! is recorded and the process keeps serving reports with no pollers running.

use std::collections::HashSet;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::poller::PositionPoller;
use crate::kernel::ServerDeps;

/// The running pollers, one per discovered line
pub struct TrackerHandle {
    shutdown: CancellationToken,
    pollers: Vec<(String, JoinHandle<()>)>,
}

impl TrackerHandle {
    fn empty(shutdown: CancellationToken) -> Self {
        Self {
            shutdown,
            pollers: Vec::new(),
        }
    }

    pub fn poller_count(&self) -> usize {
        self.pollers.len()
    }

    /// Lines being polled, in discovery order
    pub fn line_ids(&self) -> Vec<&str> {
        self.pollers.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Cancel every poller and wait for them to finish
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (line_id, handle) in self.pollers {
            if let Err(e) = handle.await {
                tracing::error!(line = %line_id, error = %e, "Poller task ended abnormally");
            }
        }
    }
}

/// Fetch all lines and spawn one poller task per distinct line id.
///
/// Pollers stop when `shutdown` (or the handle) is cancelled.
pub async fn start_tracking(
    deps: &ServerDeps,
    interval: Duration,
    shutdown: CancellationToken,
) -> TrackerHandle {
    let lines = match deps.transit.fetch_lines().await {
        Ok(lines) => lines,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Line discovery failed; no pollers started");
            let message = format!("Error fetching bus lines: {:#}", e);
            if let Err(e) = deps.store.append_error(&message).await {
                tracing::error!(error = %e, "Failed to record discovery error");
            }
            return TrackerHandle::empty(shutdown);
        }
    };

    let mut seen = HashSet::new();
    let mut handle = TrackerHandle::empty(shutdown);
    for line in lines {
        if !seen.insert(line.id.clone()) {
            tracing::debug!(line = %line.id, "Skipping duplicate line");
            continue;
        }

        let poller = PositionPoller::new(line.id.clone(), deps, interval);
        let task = tokio::spawn(poller.run(handle.shutdown.child_token()));
        handle.pollers.push((line.id, task));
    }

    tracing::info!(pollers = handle.poller_count(), "Line discovery complete");
    handle
}
