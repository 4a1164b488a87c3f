use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::socket::ws_handler;
use crate::state::AppState;

const BANNER: &str = "CCTV Age and Gender Detection API";
const RESET_DONE: &str = "Statistics reset successfully";

#[derive(Serialize)]
struct MessageBody {
    message: &'static str,
}

pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/stats", get(stats))
        .route("/api/reset-stats", post(reset_stats))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

async fn index() -> impl IntoResponse {
    Json(MessageBody { message: BANNER })
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.statistics.snapshot())
}

async fn reset_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.statistics.reset();
    log::info!("Statistics reset");
    Json(MessageBody { message: RESET_DONE })
}
