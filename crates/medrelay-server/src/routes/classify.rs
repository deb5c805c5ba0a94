use axum::extract::{Path, Query, State};
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct ClassifyParams {
    /// A single request classifies against exactly one policy version.
    #[serde(default = "default_version")]
    pub compliance_version: String,
}

fn default_version() -> String {
    "v1".to_string()
}

/// POST /classify/:message_id?compliance_version=v1 — classify one message.
pub async fn classify_message(
    State(app): State<AppState>,
    Path(message_id): Path<i64>,
    Query(params): Query<ClassifyParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db_path = app.db_path.clone();
    let result = tokio::task::spawn_blocking(move || {
        let store = medrelay_core::store::Store::open(&db_path)?;
        medrelay_core::classifier::classify(&store, message_id, &params.compliance_version)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(serde_json::to_value(result)?))
}
