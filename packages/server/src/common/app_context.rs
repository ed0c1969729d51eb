use chrono::{DateTime, Duration, Utc};

/// Process-wide facts fixed at startup.
///
/// Built once in `main` and shared read-only with whatever needs them
/// (currently the `/status` handler, for uptime).
#[derive(Debug, Clone, Copy)]
pub struct AppContext {
    started_at: DateTime<Utc>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self { started_at }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.uptime_at(Utc::now())
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}
