use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(default)]
    pub model_answer: String,
}

impl Question {
    pub fn new(text: impl Into<String>, model_answer: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            model_answer: model_answer.into().trim().to_string(),
        }
    }

    pub fn is_displayable(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn needs_model_answer(&self) -> bool {
        self.model_answer.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Llm,
    Fallback,
}
