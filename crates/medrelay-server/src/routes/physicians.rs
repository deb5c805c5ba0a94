use axum::extract::{Query, State};
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;
use medrelay_core::physician::PhysicianFilter;

#[derive(serde::Deserialize)]
pub struct PhysicianSearchParams {
    pub state: Option<String>,
    pub specialty: Option<String>,
}

/// GET /physicians?state=CA&specialty=Oncology — filtered physician search.
pub async fn search_physicians(
    State(app): State<AppState>,
    Query(params): Query<PhysicianSearchParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db_path = app.db_path.clone();
    let physicians = tokio::task::spawn_blocking(move || {
        let store = medrelay_core::store::Store::open(&db_path)?;
        store.search_physicians(&PhysicianFilter {
            state: params.state,
            specialty: params.specialty,
        })
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(serde_json::to_value(physicians)?))
}
