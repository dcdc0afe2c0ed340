//! Server-authoritative relay for a two-player grid-conquest game.
//!
//! Rooms are created on first join; the first two connections take the
//! player seats and everyone after them spectates. Clients only send intents,
//! the server validates them against [`game::GameSession`] and broadcasts the
//! resulting state to the whole room.

pub mod config;
pub mod game;
pub mod http;
pub mod protocol;
pub mod room;
pub mod telemetry;
pub mod util;
pub mod ws;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::http::routes::{self, AppState};
use crate::room::ConnectionRouter;

/// Builds the HTTP application: websocket endpoint plus health and room views.
pub fn app(config: &Config) -> Router {
    let state = AppState {
        router: Arc::new(ConnectionRouter::new(config)),
        heartbeat: config.heartbeat,
    };

    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/rooms", get(routes::list_rooms))
        .route("/rooms/:id", get(routes::view_room))
        .route("/ws", get(ws::connection::ws_handler))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
