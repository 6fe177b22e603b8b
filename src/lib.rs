pub mod db;
pub mod rooms;

use axum::{
    Json, Router,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub rooms: rooms::Rooms,
    pub version: String,
}

/// The whole HTTP surface. main and the integration tests build it the
/// same way.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/version", get(version))
        .merge(rooms::router());

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn version(State(version): State<String>) -> Json<serde_json::Value> {
    Json(json!({"version": version}))
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
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
