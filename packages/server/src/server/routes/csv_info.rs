use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::common::utils::format_kilobytes;
use crate::common::PartitionInfo;
use crate::server::app::AxumAppState;
use crate::server::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfoResponse {
    pub status: &'static str,
    pub csv_info: Vec<PartitionSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSummary {
    /// File name for CSV storage, the day for PostgreSQL
    pub date: String,
    pub row_count: u64,
    /// `"<n> KB"`, null when the backend does not track sizes
    pub size: Option<String>,
    pub first_entry_time: Option<String>,
    pub last_entry_time: Option<String>,
}

impl From<PartitionInfo> for PartitionSummary {
    fn from(info: PartitionInfo) -> Self {
        Self {
            date: info.partition,
            row_count: info.row_count,
            size: info.size_bytes.map(format_kilobytes),
            first_entry_time: info.first_entry_time,
            last_entry_time: info.last_entry_time,
        }
    }
}

/// Row count, size and first/last observation time of every stored day
pub async fn csv_info_handler(
    Extension(state): Extension<AxumAppState>,
) -> Result<Json<CsvInfoResponse>, ApiError> {
    let store = state.deps.store.as_ref();

    let partitions = match store.inventory().await {
        Ok(partitions) => partitions,
        Err(e) => return Err(ApiError::csv_info(e).record(store).await),
    };

    Ok(Json(CsvInfoResponse {
        status: "success",
        csv_info: partitions.into_iter().map(PartitionSummary::from).collect(),
    }))
}
