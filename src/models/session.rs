use crate::models::question::Question;
use serde::{Deserialize, Serialize};

/// Everything a practice session remembers between flows.
///
/// Flows receive a snapshot by `&mut`, and the session store decides whether
/// the mutated snapshot replaces the live one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub current_question: Option<Question>,
    pub previous_questions: Vec<String>,
    pub last_raw: String,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `question` current and appends it to the dedup history.
    pub fn issue(&mut self, question: Question) {
        self.previous_questions.push(question.text.clone());
        self.current_question = Some(question);
    }

    /// Keeps only the most recent raw text; `None` leaves the slot untouched.
    pub fn record_raw(&mut self, raw: Option<&str>) {
        if let Some(raw) = raw {
            self.last_raw = raw.to_string();
        }
    }
}
