pub mod error;
pub mod routes;
pub mod state;

use std::path::PathBuf;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(db_path: PathBuf) -> Router {
    let app_state = state::AppState::new(db_path);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/physicians", get(routes::physicians::search_physicians))
        .route("/messages", get(routes::messages::search_messages))
        .route(
            "/classify/{message_id}",
            post(routes::classify::classify_message),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server.
pub async fn serve(db_path: PathBuf, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(db_path, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Accepting a `TcpListener` lets the caller bind with `port = 0` and read
/// the actual port before starting.
pub async fn serve_on(db_path: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let port = listener.local_addr()?.port();
    let app = build_router(db_path);

    tracing::info!("medrelay API listening on http://localhost:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}
