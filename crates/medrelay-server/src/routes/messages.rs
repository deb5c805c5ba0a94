use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDateTime;

use crate::error::AppError;
use crate::state::AppState;
use medrelay_core::message::MessageFilter;

#[derive(serde::Deserialize)]
pub struct MessageSearchParams {
    pub physician_id: Option<i64>,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
}

/// GET /messages?physician_id=1&start_date=…&end_date=… — filtered message
/// search, ordered by timestamp. An inverted date range is a 400.
pub async fn search_messages(
    State(app): State<AppState>,
    Query(params): Query<MessageSearchParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db_path = app.db_path.clone();
    let messages = tokio::task::spawn_blocking(move || {
        let store = medrelay_core::store::Store::open(&db_path)?;
        store.search_messages(&MessageFilter {
            physician_id: params.physician_id,
            start_date: params.start_date,
            end_date: params.end_date,
        })
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(serde_json::to_value(messages)?))
}
