use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde_json::{Value, json};
use tenant_relay::message::CompletionMessage;
use tenant_relay::services::completion_gateway::{
    CompletionGateway, CompletionOutcome, OpenAiGateway,
};

#[derive(Clone)]
struct Upstream {
    status: StatusCode,
    body: Value,
    seen: Arc<Mutex<Option<(Option<String>, Value)>>>,
}

async fn completions(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *upstream.seen.lock().unwrap() = Some((auth, request));
    (upstream.status, Json(upstream.body.clone()))
}

/// Serves `/v1/chat/completions` on an ephemeral port and returns its base URL.
async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(upstream);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn upstream(status: StatusCode, body: Value) -> Upstream {
    Upstream {
        status,
        body,
        seen: Arc::new(Mutex::new(None)),
    }
}

#[tokio::test]
async fn sends_model_messages_and_bearer_key() {
    let up = upstream(
        StatusCode::OK,
        json!({"choices": [{"message": {"role": "assistant", "content": "  Hello from Acme  "}}]}),
    );
    let base = spawn_upstream(up.clone()).await;
    let gateway = OpenAiGateway::new("sk-test", "gpt-3.5-turbo", base);

    let messages = vec![CompletionMessage::system("sys"), CompletionMessage::user("Hi")];
    let outcome = gateway.complete(&messages).await;
    assert_eq!(outcome, CompletionOutcome::Completed("Hello from Acme".to_string()));

    let (auth, request) = up.seen.lock().unwrap().clone().unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(request["model"], "gpt-3.5-turbo");
    assert_eq!(request["messages"][0], json!({"role": "system", "content": "sys"}));
    assert_eq!(request["messages"][1], json!({"role": "user", "content": "Hi"}));
}

#[tokio::test]
async fn error_status_becomes_failed_outcome() {
    let up = upstream(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "You exceeded your current quota"}}),
    );
    let base = spawn_upstream(up).await;
    let gateway = OpenAiGateway::new("sk-test", "gpt-3.5-turbo", base);

    let outcome = gateway.complete(&[CompletionMessage::user("Hi")]).await;
    let reply = outcome.clone().into_reply();
    assert!(outcome.is_failed());
    assert!(reply.starts_with("⚠️ Error:"));
    assert!(reply.contains("429"));
    assert!(reply.contains("exceeded your current quota"));
}

#[tokio::test]
async fn empty_choices_is_a_failure() {
    let base = spawn_upstream(upstream(StatusCode::OK, json!({"choices": []}))).await;
    let gateway = OpenAiGateway::new("sk-test", "gpt-3.5-turbo", base);

    let outcome = gateway.complete(&[CompletionMessage::user("Hi")]).await;
    assert_eq!(
        outcome,
        CompletionOutcome::Failed("completion service returned no reply text".to_string())
    );
}

#[tokio::test]
async fn unreachable_service_is_a_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = OpenAiGateway::new("sk-test", "gpt-3.5-turbo", format!("http://{addr}/v1"));
    let outcome = gateway.complete(&[CompletionMessage::user("Hi")]).await;
    assert!(outcome.is_failed());
    assert!(outcome.into_reply().contains("request failed"));
}
