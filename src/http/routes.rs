//! HTTP routes: health and read-only room inspection.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::room::{ConnectionRouter, RoomSummary};

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ConnectionRouter>,
    pub heartbeat: Duration,
}

pub async fn healthz() -> &'static str { "ok" }

pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.router.rooms().summaries())
}

pub async fn view_room(Path(id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    match state.router.rooms().get(&id) {
        Some(room) => Json(room.snapshot()).into_response(),
        None => (StatusCode::NOT_FOUND, "room not found").into_response(),
    }
}
