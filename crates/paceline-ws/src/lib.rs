mod handler;
mod session;

use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use paceline_core::AppState;
use serde::Deserialize;

pub fn chat_router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Authentication happens at the HTTP upgrade: the token comes either from
/// the `token` query parameter (browser WebSocket clients cannot set
/// headers) or a bearer `Authorization` header. A bad token is a 401 before
/// any socket exists.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let token = match query.token.or_else(|| bearer_token(&headers)) {
        Some(token) => token,
        None => return StatusCode::UNAUTHORIZED.into_response(),
    };
    let claims = match paceline_core::auth::validate_token(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };

    let user_id = claims.sub;
    ws.on_upgrade(move |socket| handler::handle_connection(socket, state, user_id))
        .into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}
