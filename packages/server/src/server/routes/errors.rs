use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::common::ErrorRecord;
use crate::server::app::AxumAppState;
use crate::server::ApiError;

/// Number of records returned by `/errors`
pub const LATEST_ERRORS_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    pub timestamp: String,
    pub message: String,
}

impl From<ErrorRecord> for ErrorEntry {
    fn from(record: ErrorRecord) -> Self {
        Self {
            timestamp: record.iso_timestamp(),
            message: record.message,
        }
    }
}

/// Most recent error records, newest first
pub async fn errors_handler(
    Extension(state): Extension<AxumAppState>,
) -> Result<Json<Vec<ErrorEntry>>, ApiError> {
    let store = state.deps.store.as_ref();

    match store.list_errors(LATEST_ERRORS_LIMIT).await {
        Ok(errors) => Ok(Json(errors.into_iter().map(ErrorEntry::from).collect())),
        Err(e) => Err(ApiError::errors(e).record(store).await),
    }
}
