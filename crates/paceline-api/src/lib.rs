use axum::{
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use paceline_core::AppState;
use serde_json::json;

pub mod error;
pub mod middleware;
pub mod routes;

pub fn build_router() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        // Auth
        .route("/api/v1/auth/register", post(routes::auth::register))
        .route("/api/v1/auth/login", post(routes::auth::login))
        .route("/api/v1/users/@me", get(routes::auth::get_me))
        // Conversations
        .route(
            "/api/v1/conversations",
            get(routes::conversations::list_conversations),
        )
        .route(
            "/api/v1/conversations/{peer_id}/messages",
            get(routes::conversations::get_peer_messages)
                .post(routes::conversations::send_message),
        )
        .route(
            "/api/v1/conversations/{conversation_id}/history",
            get(routes::conversations::get_history),
        )
        .route(
            "/api/v1/conversations/{conversation_id}/read",
            post(routes::conversations::mark_read),
        )
        .route("/api/v1/unread", get(routes::conversations::get_unread))
        // Messages
        .route(
            "/api/v1/messages/{message_id}",
            put(routes::messages::edit_message).delete(routes::messages::delete_message),
        )
        // Attachments
        .route(
            "/api/v1/attachments",
            post(routes::files::upload_attachment),
        )
        .route(
            "/api/v1/attachments/{attachment_id}",
            get(routes::files::download_attachment).delete(routes::files::delete_attachment),
        )
        // Middleware layers
        .layer(build_cors_layer())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn build_cors_layer() -> tower_http::cors::CorsLayer {
    tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "paceline" })),
    )
}
