use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::state::SharedState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub api_key_configured: bool,
    pub mode: String,
}

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        api_key_configured: state.gateway.is_configured(),
        mode: state.mode.to_string(),
    })
}
