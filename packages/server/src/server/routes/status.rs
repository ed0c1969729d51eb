use axum::{extract::Extension, Json};
use chrono::Local;
use serde::Serialize;

use crate::common::utils::humanize_duration;
use crate::common::RecordScope;
use crate::server::app::AxumAppState;
use crate::server::ApiError;

/// Number of error lines shown by `/status`
pub const RECENT_ERROR_COUNT: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub uptime: String,
    pub date: String,
    pub total_positions: u64,
    pub today_positions: u64,
    pub total_errors: u64,
    /// Oldest to newest, as `[<timestamp>] message`
    pub recent_errors: Vec<String>,
}

/// Process status: uptime, record counts and the latest errors
pub async fn status_handler(
    Extension(state): Extension<AxumAppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let store = state.deps.store.as_ref();
    let today = Local::now().date_naive();

    let counts = async {
        let total = store.count_records(RecordScope::All).await?;
        let on_today = store.count_records(RecordScope::Day(today)).await?;
        let errors = store.count_errors().await?;
        let mut recent = store.list_errors(RECENT_ERROR_COUNT).await?;
        recent.reverse();
        anyhow::Ok((total, on_today, errors, recent))
    };

    let (total_positions, today_positions, total_errors, recent) = match counts.await {
        Ok(counts) => counts,
        Err(e) => return Err(ApiError::status(e).record(store).await),
    };

    Ok(Json(StatusResponse {
        status: "running",
        backend: store.backend_name(),
        uptime: humanize_duration(state.context.uptime()),
        date: today.format("%Y-%m-%d").to_string(),
        total_positions,
        today_positions,
        total_errors,
        recent_errors: recent.iter().map(|e| e.to_log_line()).collect(),
    }))
}
