use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use medrelay_core::MedrelayError;

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<MedrelayError>() {
            match e {
                MedrelayError::MessageNotFound(_) => StatusCode::NOT_FOUND,
                MedrelayError::InvalidDateRange
                | MedrelayError::InvalidDirection(_)
                | MedrelayError::InvalidRuleDefinition { .. } => StatusCode::BAD_REQUEST,
                MedrelayError::DataFileNotFound(_)
                | MedrelayError::Db(_)
                | MedrelayError::Io(_)
                | MedrelayError::Csv(_)
                | MedrelayError::Json(_)
                | MedrelayError::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
