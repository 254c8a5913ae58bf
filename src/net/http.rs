//! HTTP surface: the WebSocket upgrade route and the lobby side channel
//!
//! The lobby endpoints expose exactly what the registry offers a web
//! page: a public room listing and a create operation. Responses carry
//! permissive CORS headers so the lobby can live on another origin.

use std::sync::Arc;

use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::game::constants::auth;
use crate::net::heartbeat::HeartbeatRegistry;
use crate::net::session::{self, JoinParams, SharedRegistry};
use crate::room::registry::RegistryError;

#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub heartbeat: Arc<HeartbeatRegistry>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/rooms", get(list_rooms).post(create_room))
        .with_state(state)
}

const CORS_HEADERS: [(header::HeaderName, &str); 2] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST"),
];

/// Accept the upgrade unconditionally; parameter validation happens on
/// the socket so rejections can carry an application close code
async fn ws_upgrade(
    State(state): State<AppState>,
    params: Option<Query<JoinParams>>,
    ws: WebSocketUpgrade,
) -> Response {
    let params = params.map(|Query(p)| p);
    ws.on_upgrade(move |socket| {
        session::handle_socket(socket, params, state.registry, state.heartbeat)
    })
}

async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let listing = state.registry.read().await.list_public();
    (CORS_HEADERS, Json(listing))
}

/// Create a room from the lobby page; the new room has no password
async fn create_room(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(name) = headers.get("x-room-name").and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, CORS_HEADERS, "Missing room name").into_response();
    };
    if !session::valid_name(name, auth::MAX_ROOM_NAME_LEN) {
        return (StatusCode::BAD_REQUEST, CORS_HEADERS, "Invalid room name").into_response();
    }
    match state.registry.write().await.create_room(name, "") {
        Ok(room) => (StatusCode::CREATED, CORS_HEADERS, room.id().to_string()).into_response(),
        Err(err @ RegistryError::AtCapacity) => {
            (StatusCode::SERVICE_UNAVAILABLE, CORS_HEADERS, err.to_string()).into_response()
        }
        Err(err @ RegistryError::IdCollision) => {
            (StatusCode::SERVICE_UNAVAILABLE, CORS_HEADERS, err.to_string()).into_response()
        }
    }
}
