use axum::{extract::Extension, Json};

use crate::common::{PositionRecord, RecordOrder, RecordScope};
use crate::server::app::AxumAppState;
use crate::server::ApiError;

/// Number of records returned by `/positions`
pub const LATEST_POSITIONS_LIMIT: usize = 100;

/// Most recently stored positions, newest first
pub async fn positions_handler(
    Extension(state): Extension<AxumAppState>,
) -> Result<Json<Vec<PositionRecord>>, ApiError> {
    let store = state.deps.store.as_ref();

    match store
        .list_records(RecordScope::All, LATEST_POSITIONS_LIMIT, RecordOrder::NewestFirst)
        .await
    {
        Ok(records) => Ok(Json(records)),
        Err(e) => Err(ApiError::positions(e).record(store).await),
    }
}
