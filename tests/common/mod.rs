#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use tenant_relay::config::ChatMode;
use tenant_relay::message::CompletionMessage;
use tenant_relay::routes::create_router;
use tenant_relay::services::client_directory::{ClientDirectory, StaticClientDirectory};
use tenant_relay::services::completion_gateway::{CompletionGateway, CompletionOutcome};
use tenant_relay::services::transcript_log::{
    LogRecord, MemoryTranscriptStore, TranscriptError, TranscriptStore,
};
use tenant_relay::state::AppState;

/// Gateway double that returns a fixed outcome and records each call.
#[derive(Default)]
pub struct StubGateway {
    outcome: Option<CompletionOutcome>,
    calls: AtomicUsize,
    last: Mutex<Vec<CompletionMessage>>,
}

impl StubGateway {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Some(CompletionOutcome::Completed(text.to_string())),
            ..Default::default()
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Some(CompletionOutcome::Failed(reason.to_string())),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Vec<CompletionMessage> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionGateway for StubGateway {
    async fn complete(&self, messages: &[CompletionMessage]) -> CompletionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = messages.to_vec();
        self.outcome
            .clone()
            .unwrap_or_else(|| CompletionOutcome::Completed("stub reply".to_string()))
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Store whose writes always fail, as a full or read-only disk would.
#[derive(Default)]
pub struct FailingStore {
    appends: AtomicUsize,
}

impl FailingStore {
    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptStore for FailingStore {
    async fn append(&self, _client_id: &str, _record: LogRecord) -> Result<(), TranscriptError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        Err(TranscriptError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "logs directory is read-only",
        )))
    }

    async fn read(&self, _client_id: &str) -> Result<Vec<LogRecord>, TranscriptError> {
        Ok(Vec::new())
    }

    async fn list_all(&self) -> Result<Vec<LogRecord>, TranscriptError> {
        Ok(Vec::new())
    }
}

pub fn app(
    mode: ChatMode,
    directory: StaticClientDirectory,
    gateway: Arc<StubGateway>,
    store: Arc<MemoryTranscriptStore>,
) -> Router {
    app_with_store(mode, directory, gateway, store)
}

pub fn app_with_store(
    mode: ChatMode,
    directory: StaticClientDirectory,
    gateway: Arc<StubGateway>,
    transcripts: Arc<dyn TranscriptStore>,
) -> Router {
    let directory: Arc<dyn ClientDirectory> = Arc::new(directory);
    let state = Arc::new(AppState::new(mode, directory, gateway, transcripts));
    create_router().with_state(state)
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
