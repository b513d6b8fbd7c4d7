//! Shared helpers for the HTTP integration tests: an in-memory application,
//! a scripted language model, and request/response shortcuts.

#![allow(dead_code)]

use api_lib::adapters::CrfTagger;
use api_lib::web::{auth::JwtKeys, build_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use silogia_core::{
    AnalysisService, ArgumentExtractor, CompletionService, FeatureExtractor, InMemoryDatabase,
    PortError, PortResult, RetryPolicy, RuleAnnotator, SuggestionGenerator,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`

/// The bootstrap model shipped with the repository.
pub const MODEL_JSON: &str = include_str!("../../../../models/crf_model.json");

pub const EXAMPLE: &str =
    "La educación es fundamental para el desarrollo. Por lo tanto, debemos invertir más en escuelas.";

/// Replays scripted answers; once they run out every call fails as unreachable.
pub struct StubCompletion {
    answers: Mutex<VecDeque<PortResult<String>>>,
    calls: AtomicUsize,
}

impl StubCompletion {
    pub fn new(answers: Vec<PortResult<String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for StubCompletion {
    async fn complete(&self, _prompt: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PortError::Unavailable("connection refused".into())))
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDatabase>,
    pub completion: Arc<StubCompletion>,
}

pub fn test_app(answers: Vec<PortResult<String>>) -> TestApp {
    build(answers, true)
}

/// An application whose tagging model failed to load.
pub fn test_app_without_model() -> TestApp {
    build(Vec::new(), false)
}

fn build(answers: Vec<PortResult<String>>, with_model: bool) -> TestApp {
    let db = Arc::new(InMemoryDatabase::new());
    let completion = Arc::new(StubCompletion::new(answers));
    let extractor = with_model.then(|| {
        ArgumentExtractor::new(
            Arc::new(RuleAnnotator::new()),
            Arc::new(CrfTagger::from_json(MODEL_JSON).expect("bundled model parses")),
            FeatureExtractor::default(),
        )
    });
    let suggestions = SuggestionGenerator::new(
        completion.clone(),
        RetryPolicy {
            timeout: Duration::from_secs(2),
            backoff: Duration::from_millis(1),
        },
    );
    let state = Arc::new(AppState {
        db: db.clone(),
        analysis: AnalysisService::new(db.clone(), extractor, suggestions, 2_000),
        jwt: JwtKeys::new("test-secret", chrono::Duration::hours(1)),
    });
    let router = build_router(state, &["http://localhost:3000".to_string()]);
    TestApp {
        router,
        db,
        completion,
    }
}

impl TestApp {
    /// Sends one request and returns the status and the JSON body (`Null` when empty).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn register(&self, username: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/users/register",
            None,
            Some(json!({
                "email": format!("{}@example.com", username),
                "username": username,
                "password": "secreto123",
                "full_name": "Usuaria de Prueba"
            })),
        )
        .await
    }

    /// Registers `username` and logs in, returning the bearer token and user id.
    pub async fn login_new_user(&self, username: &str) -> (String, String) {
        let (status, _) = self.register(username).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = self
            .send(
                "POST",
                "/api/users/login",
                None,
                Some(json!({ "username": username, "password": "secreto123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }
}
