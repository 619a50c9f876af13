use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use interview_practice::error::{Error, Result};
use interview_practice::services::interview_service::{FlowSettings, STATUS_READY};
use interview_practice::services::llm_client::{
    GenerateContentRequest, GenerationOptions, LlmSettings, ModelBackend,
};
use interview_practice::{router, AppState};
use serde_json::{json, Value as JsonValue};
use tokio::sync::Notify;
use tower::ServiceExt;

/// Replies in order; `None` or an exhausted script is a 503.
#[derive(Default)]
struct ScriptedBackend {
    replies: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(replies: &[Option<&str>]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.map(str::to_string)).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate_content(
        &self,
        _model: &str,
        request: &GenerateContentRequest,
    ) -> Result<JsonValue> {
        self.prompts
            .lock()
            .unwrap()
            .push(request.contents[0].parts[0].text.clone());
        match self.replies.lock().unwrap().pop_front().flatten() {
            Some(text) => Ok(text_body(&text)),
            None => Err(Error::Upstream {
                status: 503,
                body: "unavailable".into(),
            }),
        }
    }
}

fn text_body(text: &str) -> JsonValue {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

/// Holds the first call until released; later calls answer immediately.
#[derive(Default)]
struct GatedBackend {
    calls: AtomicUsize,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ModelBackend for GatedBackend {
    async fn generate_content(
        &self,
        _model: &str,
        _request: &GenerateContentRequest,
    ) -> Result<JsonValue> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            self.entered.notify_one();
            self.release.notified().await;
        }
        let reply = format!(
            r#"[{{"q":"Question number {} about caching?","solution":"Use a TTL."}}]"#,
            call + 1
        );
        Ok(text_body(&reply))
    }
}

fn app(backend: Arc<dyn ModelBackend>) -> Router {
    let llm = LlmSettings {
        models: vec!["test-model".into()],
        default_max_retries: 1,
        backoff_base: Duration::ZERO,
        backoff_jitter: Duration::ZERO,
        ..LlmSettings::default()
    };
    let flow = FlowSettings {
        start: GenerationOptions::new(0.6, 1),
        regenerate: GenerationOptions::new(0.7, 1),
        solution: GenerationOptions::new(0.2, 1),
        retry_backoff_base: Duration::ZERO,
        retry_backoff_jitter: Duration::ZERO,
        ..FlowSettings::default()
    };
    router(AppState::with_backend(backend, llm, flow), 1000)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, json)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app(ScriptedBackend::new(&[]));
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn start_then_answer_round_trip() {
    let backend = ScriptedBackend::new(&[
        Some(r#"```json
[{"q":"How would you shard a write-heavy table?","solution":"Partition by a high-cardinality key."}]
```"#),
        Some("Score: 6/10\nStrengths:\n- Mentions keys\nImprovements:\n- Discuss rebalancing\nModel answer:\nPartition by key."),
    ]);
    let app = app(backend.clone());

    let (status, question) = send(
        &app,
        "POST",
        "/api/interview/start",
        Some(json!({ "role": "Backend engineer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(question["question"], "How would you shard a write-heavy table?");
    assert_eq!(question["model_answer"], "Partition by a high-cardinality key.");
    assert_eq!(question["source"], "llm");
    assert_eq!(question["status"], STATUS_READY);
    assert!(question["html"]
        .as_str()
        .unwrap()
        .contains("How would you shard a write-heavy table?"));

    let (status, feedback) = send(
        &app,
        "POST",
        "/api/interview/answer",
        Some(json!({ "answer": "Hash the tenant id." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feedback["score"], 6);
    assert_eq!(feedback["from_fallback"], false);
    assert_eq!(feedback["model_answer"], "Partition by a high-cardinality key.");
    assert!(backend.prompts.lock().unwrap()[1].contains("A: Hash the tenant id."));

    let (_, session) = send(&app, "GET", "/api/interview/current", None).await;
    assert_eq!(
        session["previous_questions"],
        json!(["How would you shard a write-heavy table?"])
    );
    assert!(session["last_raw"].as_str().unwrap().starts_with("Score: 6/10"));
}

#[tokio::test]
async fn unavailable_backend_falls_back_everywhere() {
    let backend = ScriptedBackend::new(&[]);
    let app = app(backend.clone());

    let (status, first) = send(
        &app,
        "POST",
        "/api/interview/start",
        Some(json!({ "role": "ML engineer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["source"], "fallback");
    assert_eq!(first["question"], "How do you prevent data leakage when training ML models?");

    let (status, second) = send(
        &app,
        "POST",
        "/api/interview/regenerate",
        Some(json!({ "role": "ML engineer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["source"], "fallback");
    assert_eq!(second["attempts"], 4);
    assert_eq!(second["question"], "Explain bias-variance tradeoff and ways to diagnose it.");

    let (status, feedback) = send(
        &app,
        "POST",
        "/api/interview/answer",
        Some(json!({ "answer": "Regularize." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feedback["from_fallback"], true);
    assert_eq!(feedback["score"], 8);
    assert!(feedback["feedback"].as_str().unwrap().contains("Score: 8/10"));

    // start 1, regenerate 4, evaluation 1
    assert_eq!(backend.calls(), 6);
}

#[tokio::test]
async fn blank_answer_is_rejected() {
    let backend = ScriptedBackend::new(&[]);
    let app = app(backend.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/interview/answer",
        Some(json!({ "answer": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please type your answer before submitting.");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn current_before_start_is_empty() {
    let app = app(ScriptedBackend::new(&[]));
    let (status, body) = send(&app, "GET", "/api/interview/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["current_question"].is_null());
    assert!(body["html"].as_str().unwrap().contains("No question available."));
}

#[tokio::test]
async fn superseded_start_gets_conflict() {
    let backend = Arc::new(GatedBackend::default());
    let app = app(backend.clone());

    let first_app = app.clone();
    let first = tokio::spawn(async move {
        send(&first_app, "POST", "/api/interview/start", Some(json!({}))).await
    });
    backend.entered.notified().await;

    let (status, second) = send(&app, "POST", "/api/interview/start", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["question"], "Question number 2 about caching?");

    backend.release.notify_one();
    let (status, body) = first.await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (_, session) = send(&app, "GET", "/api/interview/current", None).await;
    assert_eq!(
        session["current_question"]["text"],
        "Question number 2 about caching?"
    );
    assert_eq!(
        session["previous_questions"],
        json!(["Question number 2 about caching?"])
    );
}
