pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::middleware::rate_limit::{rps_middleware, RateLimiter};
use crate::services::{
    interview_service::{FlowSettings, InterviewService},
    llm_client::{GeminiBackend, LlmClient, LlmSettings, ModelBackend},
    session_store::SessionStore,
};
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub interview: InterviewService,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        let backend = GeminiBackend::new(
            config.gemini_api_key.clone(),
            &config.gemini_base_url,
            http_client,
        )?;

        Ok(Self::with_backend(
            Arc::new(backend),
            LlmSettings::from_config(config),
            FlowSettings::from_config(config),
        ))
    }

    pub fn with_backend(
        backend: Arc<dyn ModelBackend>,
        llm_settings: LlmSettings,
        flow_settings: FlowSettings,
    ) -> Self {
        let llm = LlmClient::new(backend, llm_settings);
        Self {
            interview: InterviewService::new(llm, flow_settings),
            sessions: SessionStore::new(),
        }
    }
}

/// Application routes without the outer CORS and trace layers.
pub fn router(state: AppState, public_rps: u32) -> Router {
    let interview_api = Router::new()
        .route("/api/interview/start", post(routes::interview::start))
        .route(
            "/api/interview/regenerate",
            post(routes::interview::regenerate),
        )
        .route("/api/interview/answer", post(routes::interview::submit_answer))
        .route("/api/interview/current", get(routes::interview::current))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(public_rps),
            rps_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(interview_api)
        .with_state(state)
}
