// src/routes/mod.rs
pub mod chat;
pub mod health;

use crate::config::CorsOrigins;
use crate::state::SharedState;
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use chat::{chat_handler, client_logs_handler, list_logs_handler};
use health::health_handler;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(|| async { "YOU ARE CONNECTED" }))
        .route("/chat", post(chat_handler))
        .route("/chat/", post(chat_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/", post(chat_handler))
        .route("/logs", get(list_logs_handler))
        .route("/api/logs", get(list_logs_handler))
        .route("/logs/{client_id}", get(client_logs_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
}

/// Origins come from configuration; methods and headers are unrestricted.
pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(parsed)
        }
    }
}
