use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::feedback::Feedback;
use crate::models::question::{Question, QuestionSource};
use crate::services::interview_service::QuestionOutcome;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(max = 120, message = "Role must be at most 120 characters"))]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(
        custom(
            function = "crate::utils::validation::not_blank",
            message = "Please type your answer before submitting."
        ),
        length(max = 10000, message = "Answer must be at most 10000 characters")
    )]
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub id: uuid::Uuid,
    pub question: String,
    pub model_answer: String,
    pub source: QuestionSource,
    pub status: String,
    pub attempts: usize,
    pub rate_limited: bool,
    pub html: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl QuestionResponse {
    pub fn new(outcome: QuestionOutcome, html: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            question: outcome.question.text,
            model_answer: outcome.question.model_answer,
            source: outcome.source,
            status: outcome.status,
            attempts: outcome.attempts,
            rate_limited: outcome.rate_limited,
            html,
            generated_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub score: Option<u8>,
    pub feedback: String,
    pub model_answer: String,
    pub from_fallback: bool,
    pub html: String,
}

impl FeedbackResponse {
    pub fn new(feedback: Feedback, html: String) -> Self {
        Self {
            score: feedback.score,
            feedback: feedback.text,
            model_answer: feedback.model_answer,
            from_fallback: feedback.from_fallback,
            html,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub current_question: Option<Question>,
    pub previous_questions: Vec<String>,
    pub last_raw: String,
    pub html: String,
}
