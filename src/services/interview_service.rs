use crate::config::{Config, DEFAULT_ROLE};
use crate::error::{Error, Result};
use crate::models::feedback::Feedback;
use crate::models::question::{Question, QuestionSource};
use crate::models::session::SessionContext;
use crate::services::fallback_bank::{first_for_role, first_unused_for_role};
use crate::services::llm_client::{GenerationOptions, LlmClient};
use crate::services::prompts::{
    evaluation_prompt, question_prompt, solution_prompt, REGENERATE_VARIETY_HINT,
    START_VARIETY_HINT,
};
use crate::services::response_parser::{
    extract_score, extract_solution_from_text, parse_question, parse_solution_response,
};
use crate::utils::backoff::jittered;
use crate::utils::nonce::generate_nonce;
use crate::utils::text::is_distinct;
use std::time::Duration;

pub const STATUS_READY: &str = "Question ready";
pub const STATUS_START_FALLBACK: &str = "LLM failed, using local fallback question.";
pub const STATUS_REGENERATED: &str = "New question ready.";
pub const STATUS_REGENERATE_FALLBACK: &str =
    "Could not get distinct LLM result, using local fallback.";
pub const STATUS_RATE_LIMITED: &str =
    "Rate limited (429). Try again later or use lower frequency.";
pub const EMPTY_ANSWER: &str = "Please type your answer before submitting.";
pub const MODEL_ANSWER_UNAVAILABLE: &str = "Model answer not available.";

#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub default_role: String,
    pub similarity_threshold: f64,
    pub max_regenerate_attempts: usize,
    pub start: GenerationOptions,
    pub regenerate: GenerationOptions,
    pub solution: GenerationOptions,
    pub evaluation: GenerationOptions,
    pub retry_backoff_base: Duration,
    pub retry_backoff_jitter: Duration,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            default_role: DEFAULT_ROLE.to_string(),
            similarity_threshold: 0.45,
            max_regenerate_attempts: 4,
            start: GenerationOptions::new(0.6, 3),
            regenerate: GenerationOptions::new(0.7, 3),
            solution: GenerationOptions::new(0.2, 2),
            evaluation: GenerationOptions::default(),
            retry_backoff_base: Duration::from_millis(250),
            retry_backoff_jitter: Duration::from_millis(300),
        }
    }
}

impl FlowSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_role: config.default_role.clone(),
            similarity_threshold: config.similarity_threshold,
            max_regenerate_attempts: config.max_regenerate_attempts.max(1),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuestionOutcome {
    pub question: Question,
    pub source: QuestionSource,
    pub status: String,
    pub attempts: usize,
    pub rate_limited: bool,
}

impl QuestionOutcome {
    fn new(
        question: Question,
        source: QuestionSource,
        status: &str,
        attempts: usize,
        rate_limited: bool,
    ) -> Self {
        let status = if source == QuestionSource::Fallback && rate_limited {
            format!("{} {}", status, STATUS_RATE_LIMITED)
        } else {
            status.to_string()
        };
        Self {
            question,
            source,
            status,
            attempts,
            rate_limited,
        }
    }
}

#[derive(Clone)]
pub struct InterviewService {
    llm: LlmClient,
    settings: FlowSettings,
}

impl InterviewService {
    pub fn new(llm: LlmClient, settings: FlowSettings) -> Self {
        Self { llm, settings }
    }

    pub fn resolve_role(&self, role: Option<&str>) -> String {
        role.map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.settings.default_role.as_str())
            .to_string()
    }

    pub async fn start_interview(
        &self,
        session: &mut SessionContext,
        role: Option<&str>,
    ) -> QuestionOutcome {
        session.current_question = None;
        session.last_raw.clear();

        let role = self.resolve_role(role);
        let nonce = generate_nonce();
        let prompt = question_prompt(
            &role,
            &session.previous_questions,
            Some(&nonce),
            Some(START_VARIETY_HINT),
        );

        tracing::info!(role = %role, asked = session.previous_questions.len(), "generating question");
        let outcome = self.llm.generate(&prompt, self.settings.start).await;
        session.record_raw(outcome.raw.as_deref());
        let mut rate_limited = outcome.rate_limited;

        let result = match outcome.text.as_deref().and_then(parse_question) {
            Some(mut question) => {
                if question.needs_model_answer() {
                    rate_limited |= self
                        .backfill_model_answer(session, &mut question, &nonce)
                        .await;
                }
                QuestionOutcome::new(question, QuestionSource::Llm, STATUS_READY, 1, rate_limited)
            }
            None => {
                tracing::warn!(role = %role, "no usable question from LLM, using fallback bank");
                QuestionOutcome::new(
                    first_for_role(&role),
                    QuestionSource::Fallback,
                    STATUS_START_FALLBACK,
                    1,
                    rate_limited,
                )
            }
        };

        session.issue(result.question.clone());
        result
    }

    pub async fn regenerate_question(
        &self,
        session: &mut SessionContext,
        role: Option<&str>,
    ) -> QuestionOutcome {
        session.last_raw.clear();

        let role = self.resolve_role(role);
        let max_attempts = self.settings.max_regenerate_attempts;
        let mut rate_limited = false;

        for attempt in 1..=max_attempts {
            let nonce = generate_nonce();
            let prompt = question_prompt(
                &role,
                &session.previous_questions,
                Some(&nonce),
                Some(REGENERATE_VARIETY_HINT),
            );

            let outcome = self.llm.generate(&prompt, self.settings.regenerate).await;
            session.record_raw(outcome.raw.as_deref());
            rate_limited |= outcome.rate_limited;

            let Some(mut candidate) = outcome.text.as_deref().and_then(parse_question) else {
                tracing::warn!(attempt, "nothing parseable, retrying");
                self.pause_between_attempts(attempt).await;
                continue;
            };

            if !is_distinct(
                &candidate.text,
                &session.previous_questions,
                self.settings.similarity_threshold,
            ) {
                tracing::warn!(attempt, "too similar to a previous question, retrying");
                self.pause_between_attempts(attempt).await;
                continue;
            }

            if candidate.needs_model_answer() {
                rate_limited |= self
                    .backfill_model_answer(session, &mut candidate, &nonce)
                    .await;
            }

            tracing::info!(attempt, "distinct question accepted");
            let result = QuestionOutcome::new(
                candidate,
                QuestionSource::Llm,
                STATUS_REGENERATED,
                attempt,
                rate_limited,
            );
            session.issue(result.question.clone());
            return result;
        }

        tracing::warn!(max_attempts, "no distinct LLM question, using fallback bank");
        let result = QuestionOutcome::new(
            first_unused_for_role(&role, &session.previous_questions),
            QuestionSource::Fallback,
            STATUS_REGENERATE_FALLBACK,
            max_attempts,
            rate_limited,
        );
        session.issue(result.question.clone());
        result
    }

    /// Fills `question.model_answer` via a follow-up call, then by scraping the
    /// last raw reply. Returns whether any call was rate limited.
    async fn backfill_model_answer(
        &self,
        session: &mut SessionContext,
        question: &mut Question,
        nonce: &str,
    ) -> bool {
        let (answer, rate_limited) = self
            .fetch_solution_for_question(session, &question.text, nonce)
            .await;

        if !answer.is_empty() {
            question.model_answer = answer;
            return rate_limited;
        }

        // Scraping the question reply can hand back the question itself.
        let scraped = extract_solution_from_text(&session.last_raw);
        if !scraped.is_empty() && !scraped.contains(&question.text) {
            question.model_answer = scraped;
        } else {
            tracing::warn!("model answer unavailable after follow-up");
        }
        rate_limited
    }

    pub async fn fetch_solution_for_question(
        &self,
        session: &mut SessionContext,
        question: &str,
        nonce: &str,
    ) -> (String, bool) {
        let prompt = solution_prompt(question, Some(nonce));
        let outcome = self.llm.generate(&prompt, self.settings.solution).await;
        session.record_raw(outcome.raw.as_deref());

        let answer = outcome
            .text
            .as_deref()
            .and_then(parse_solution_response)
            .map(|a| a.trim().to_string())
            .unwrap_or_default();
        (answer, outcome.rate_limited)
    }

    pub async fn evaluate_answer(
        &self,
        session: &mut SessionContext,
        answer: &str,
    ) -> Result<Feedback> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::BadRequest(EMPTY_ANSWER.to_string()));
        }

        let question_text = session
            .current_question
            .as_ref()
            .map(|q| q.text.clone())
            .unwrap_or_else(|| "Question".to_string());
        let model_answer = session
            .current_question
            .as_ref()
            .map(|q| q.model_answer.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| MODEL_ANSWER_UNAVAILABLE.to_string());

        let prompt = evaluation_prompt(&question_text, answer);
        let outcome = self.llm.generate(&prompt, self.settings.evaluation).await;
        session.record_raw(outcome.raw.as_deref());

        let (text, from_fallback) = match outcome.text {
            Some(text) => (text, false),
            None => {
                tracing::warn!("evaluation unavailable, using fallback feedback");
                (fallback_feedback(&model_answer), true)
            }
        };

        Ok(Feedback {
            score: extract_score(&text),
            text,
            model_answer,
            from_fallback,
        })
    }

    async fn pause_between_attempts(&self, attempt: usize) {
        if attempt < self.settings.max_regenerate_attempts {
            tokio::time::sleep(jittered(
                self.settings.retry_backoff_base,
                self.settings.retry_backoff_jitter,
            ))
            .await;
        }
    }
}

fn fallback_feedback(model_answer: &str) -> String {
    format!(
        "Score: 8/10\nStrengths:\n- Clear structure\nImprovements:\n- Add technical depth and examples\nModel answer:\n{}",
        model_answer
    )
}
