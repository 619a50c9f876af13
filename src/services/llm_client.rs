use crate::config::{Config, DEFAULT_MODELS};
use crate::error::{Error, Result};
use crate::utils::backoff::jittered;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerateContentRequest {
    pub fn new(prompt: &str, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens,
            },
        }
    }
}

/// One HTTP round trip to one model. Implementations report 429 as
/// [`Error::RateLimited`] and other non-2xx statuses as [`Error::Upstream`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<JsonValue>;
}

#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, base_url: &str, client: Client) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid GEMINI_BASE_URL {}: {}", base_url, e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/models/{}:generateContent", self.base_url, model))
            .map_err(|e| Error::Config(format!("Invalid model endpoint for {}: {}", model, e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<JsonValue> {
        let res = self
            .client
            .post(self.endpoint(model)?)
            .json(request)
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let text = res.text().await.unwrap_or_default();
            return Err(Error::RateLimited(format!("{}: {}", model, text)));
        }
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(res.json().await?)
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub models: Vec<String>,
    pub default_temperature: f32,
    pub default_max_retries: usize,
    pub max_output_tokens: u32,
    pub backoff_base: Duration,
    pub backoff_jitter: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            default_temperature: 0.18,
            default_max_retries: 3,
            max_output_tokens: 700,
            backoff_base: Duration::from_millis(300),
            backoff_jitter: Duration::from_millis(400),
        }
    }
}

impl LlmSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            models: config.models.clone(),
            default_max_retries: config.llm_max_retries,
            max_output_tokens: config.llm_max_output_tokens,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_retries: Option<usize>,
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_retries: usize) -> Self {
        Self {
            temperature: Some(temperature),
            max_retries: Some(max_retries),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmOutcome {
    pub text: Option<String>,
    pub raw: Option<String>,
    pub rate_limited: bool,
    pub model: Option<String>,
}

#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn ModelBackend>,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn ModelBackend>, settings: LlmSettings) -> Self {
        Self { backend, settings }
    }

    /// Tries every model in order, for up to `max_retries` rounds, and returns
    /// the first non-empty text. Never fails: exhaustion yields `text: None`.
    pub async fn generate(&self, prompt: &str, options: GenerationOptions) -> LlmOutcome {
        let temperature = options
            .temperature
            .unwrap_or(self.settings.default_temperature);
        let max_retries = options
            .max_retries
            .unwrap_or(self.settings.default_max_retries);
        let request =
            GenerateContentRequest::new(prompt, temperature, self.settings.max_output_tokens);

        let mut outcome = LlmOutcome::default();

        for attempt in 1..=max_retries {
            for model in &self.settings.models {
                match self.backend.generate_content(model, &request).await {
                    Ok(body) => {
                        if let Some(text) = candidate_text(&body) {
                            tracing::info!(model = %model, attempt, "generation succeeded");
                            outcome.raw = Some(text.clone());
                            outcome.text = Some(text);
                            outcome.model = Some(model.clone());
                            return outcome;
                        }
                        tracing::warn!(model = %model, attempt, "response carried no candidate text");
                        outcome.raw = Some(body.to_string());
                    }
                    Err(Error::RateLimited(msg)) => {
                        tracing::warn!(model = %model, attempt, "rate limited (429): {}", msg);
                        outcome.rate_limited = true;
                    }
                    Err(e) => {
                        tracing::warn!(model = %model, attempt, error = %e, "generation failed");
                    }
                }
            }

            if attempt < max_retries {
                tokio::time::sleep(jittered(
                    self.settings.backoff_base,
                    self.settings.backoff_jitter,
                ))
                .await;
            }
        }

        tracing::warn!(max_retries, "no model produced text");
        outcome
    }
}

/// Thinking models may put an empty part before the real one.
fn candidate_text(body: &JsonValue) -> Option<String> {
    body.get("candidates")?
        .as_array()?
        .iter()
        .filter_map(|c| c.pointer("/content/parts").and_then(JsonValue::as_array))
        .flatten()
        .filter_map(|part| part.get("text").and_then(JsonValue::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_body(text: &str) -> JsonValue {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    fn is_model(model: &str, name: &str) -> bool {
        model == name
    }

    fn client(mock: MockModelBackend, models: &[&str]) -> LlmClient {
        LlmClient::new(
            Arc::new(mock),
            LlmSettings {
                models: models.iter().map(|m| m.to_string()).collect(),
                backoff_base: Duration::ZERO,
                backoff_jitter: Duration::ZERO,
                ..LlmSettings::default()
            },
        )
    }

    #[test]
    fn request_serializes_to_generate_content_shape() {
        let req = GenerateContentRequest::new("hi", 0.6, 700);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "contents": [{ "parts": [{ "text": "hi" }] }],
                "generationConfig": { "temperature": 0.6f32, "maxOutputTokens": 700 }
            })
        );
    }

    #[test]
    fn endpoint_carries_model_and_key() {
        let backend = GeminiBackend::new(
            "secret".into(),
            "https://example.test/v1beta/",
            Client::new(),
        )
        .unwrap();
        assert_eq!(
            backend.endpoint("gemini-2.5-flash").unwrap().as_str(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent?key=secret"
        );
        assert!(GeminiBackend::new("k".into(), "not a url", Client::new()).is_err());
    }

    #[test]
    fn candidate_text_skips_empty_parts() {
        let body = json!({ "candidates": [{ "content": { "parts": [
            { "text": "  ", "thought": true },
            { "text": " real answer " }
        ] } }] });
        assert_eq!(candidate_text(&body).as_deref(), Some("real answer"));
        assert_eq!(candidate_text(&json!({ "candidates": [] })), None);
        assert_eq!(candidate_text(&json!({ "error": "x" })), None);
    }

    #[tokio::test]
    async fn first_model_success_wins() {
        let mut mock = MockModelBackend::new();
        mock.expect_generate_content()
            .withf(|model, _| is_model(model, "m1"))
            .times(1)
            .returning(|_, _| Ok(text_body("  first answer  ")));
        mock.expect_generate_content()
            .withf(|model, _| is_model(model, "m2"))
            .times(0);

        let outcome = client(mock, &["m1", "m2"])
            .generate("prompt", GenerationOptions::new(0.6, 3))
            .await;

        assert_eq!(outcome.text.as_deref(), Some("first answer"));
        assert_eq!(outcome.raw.as_deref(), Some("first answer"));
        assert_eq!(outcome.model.as_deref(), Some("m1"));
        assert!(!outcome.rate_limited);
    }

    #[tokio::test]
    async fn rate_limit_falls_through_to_next_model() {
        let mut mock = MockModelBackend::new();
        mock.expect_generate_content()
            .withf(|model, _| is_model(model, "m1"))
            .times(1)
            .returning(|_, _| Err(Error::RateLimited("m1: quota".into())));
        mock.expect_generate_content()
            .withf(|model, _| is_model(model, "m2"))
            .times(1)
            .returning(|_, _| Ok(text_body("second")));

        let outcome = client(mock, &["m1", "m2"])
            .generate("prompt", GenerationOptions::default())
            .await;

        assert_eq!(outcome.text.as_deref(), Some("second"));
        assert_eq!(outcome.model.as_deref(), Some("m2"));
        assert!(outcome.rate_limited);
    }

    #[tokio::test]
    async fn exhaustion_tries_every_model_every_round() {
        let mut mock = MockModelBackend::new();
        mock.expect_generate_content().times(6).returning(|_, _| {
            Err(Error::Upstream {
                status: 500,
                body: "boom".into(),
            })
        });

        let outcome = client(mock, &["m1", "m2"])
            .generate("prompt", GenerationOptions::new(0.2, 3))
            .await;

        assert_eq!(outcome.text, None);
        assert_eq!(outcome.model, None);
    }

    #[tokio::test]
    async fn textless_body_is_kept_as_raw() {
        let mut mock = MockModelBackend::new();
        mock.expect_generate_content()
            .times(2)
            .returning(|_, _| Ok(json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] })));

        let outcome = client(mock, &["only"])
            .generate("prompt", GenerationOptions::new(0.2, 2))
            .await;

        assert_eq!(outcome.text, None);
        assert!(outcome.raw.unwrap().contains("MAX_TOKENS"));
    }

    #[tokio::test]
    async fn options_reach_the_request() {
        let mut mock = MockModelBackend::new();
        mock.expect_generate_content()
            .withf(|_, req| {
                req.generation_config.temperature == 0.7
                    && req.generation_config.max_output_tokens == 700
                    && req.contents[0].parts[0].text == "the prompt"
            })
            .times(1)
            .returning(|_, _| Ok(text_body("ok")));

        let outcome = client(mock, &["m1"])
            .generate("the prompt", GenerationOptions::new(0.7, 1))
            .await;
        assert_eq!(outcome.text.as_deref(), Some("ok"));
    }
}
