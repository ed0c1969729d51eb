use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::kernel::BasePositionStore;

/// Failure of a reporting handler.
///
/// The client only sees the generic message; the cause goes to the log and
/// to the error records (see [`ApiError::record`]).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unable to fetch status.")]
    Status { cause: anyhow::Error },

    #[error("Unable to fetch CSV info.")]
    CsvInfo { cause: anyhow::Error },

    #[error("Unable to fetch positions.")]
    Positions { cause: anyhow::Error },

    #[error("Unable to fetch errors.")]
    Errors { cause: anyhow::Error },
}

impl ApiError {
    pub fn status(cause: anyhow::Error) -> Self {
        Self::Status { cause }
    }

    pub fn csv_info(cause: anyhow::Error) -> Self {
        Self::CsvInfo { cause }
    }

    pub fn positions(cause: anyhow::Error) -> Self {
        Self::Positions { cause }
    }

    pub fn errors(cause: anyhow::Error) -> Self {
        Self::Errors { cause }
    }

    pub fn cause(&self) -> &anyhow::Error {
        match self {
            Self::Status { cause }
            | Self::CsvInfo { cause }
            | Self::Positions { cause }
            | Self::Errors { cause } => cause,
        }
    }

    /// Text of the error record written for this failure
    pub fn record_message(&self) -> String {
        let what = match self {
            Self::Status { .. } => "status",
            Self::CsvInfo { .. } => "CSV info",
            Self::Positions { .. } => "positions",
            Self::Errors { .. } => "errors",
        };
        format!("Error fetching {}: {:#}", what, self.cause())
    }

    /// Append an error record for this failure and hand the error back.
    ///
    /// A store that cannot take the record either is only logged; the
    /// response stays the same.
    pub async fn record(self, store: &dyn BasePositionStore) -> Self {
        let message = self.record_message();
        tracing::error!(error = %message, "Reporting request failed");
        if let Err(e) = store.append_error(&message).await {
            tracing::error!(error = %e, "Failed to record reporting error");
        }
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "error",
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}
