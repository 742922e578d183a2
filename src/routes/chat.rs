use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::ChatMode,
    error::AppError,
    message::{ChatRequest, ChatResponse, RawChatRequest},
    services::{
        completion_gateway::WARNING_MARKER,
        prompt_builder,
        transcript_log::LogRecord,
    },
    state::SharedState,
};

pub fn unknown_client_reply() -> String {
    format!("{WARNING_MARKER} Unknown or disabled client.")
}

/// `POST /chat`. Validation failures are the only non-200 outcome.
pub async fn chat_handler(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let request = RawChatRequest::from_slice(&body)?.normalize()?;

    let span = tracing::info_span!(
        "chat",
        request_id = %Uuid::new_v4(),
        client_id = %request.client_id,
        mode = %state.mode,
    );

    let reply = handle_chat(&state, request).instrument(span).await;
    Ok(Json(ChatResponse { reply }))
}

/// Routes a validated request and returns the reply text.
pub async fn handle_chat(state: &SharedState, request: ChatRequest) -> String {
    let greeting = if state.mode.is_gated() {
        match state.directory.resolve(&request.client_id).await {
            Some(client) if client.enabled => Some(client.bot_greeting),
            _ => {
                tracing::info!("rejected unknown or disabled client");
                return unknown_client_reply();
            }
        }
    } else {
        None
    };

    let reply = match (state.mode, greeting) {
        (ChatMode::Echo, Some(greeting)) => format!("{greeting} You said: '{}'", request.message),
        _ => {
            let messages = prompt_builder::build(&request.meta, &request.history, &request.message);
            let outcome = state.gateway.complete(&messages).await;
            if outcome.is_failed() {
                tracing::warn!("upstream failure returned as reply text");
            }
            outcome.into_reply()
        }
    };

    let record = LogRecord::new(
        request.client_id.clone(),
        request.message,
        reply.clone(),
        request.meta,
    );
    if let Err(error) = state.transcripts.append(&request.client_id, record).await {
        tracing::warn!(%error, "failed to persist transcript record");
    }

    reply
}

/// `GET /logs`. Every client's records, flattened.
pub async fn list_logs_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    let records = state
        .transcripts
        .list_all()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(records))
}

/// `GET /logs/{client_id}`.
pub async fn client_logs_handler(
    State(state): State<SharedState>,
    Path(client_id): Path<String>,
) -> Result<Json<Vec<LogRecord>>, AppError> {
    let records = state
        .transcripts
        .read(&client_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(records))
}
