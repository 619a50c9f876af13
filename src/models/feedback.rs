use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub score: Option<u8>,
    pub text: String,
    pub model_answer: String,
    pub from_fallback: bool,
}
