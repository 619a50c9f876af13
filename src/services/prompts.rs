//! Prompt text sent to the generation backend.

pub const START_VARIETY_HINT: &str = "Concrete scenario preferred.";
pub const REGENERATE_VARIETY_HINT: &str =
    "Do NOT repeat previous questions. Make this question distinct.";
const DEFAULT_VARIETY_HINT: &str =
    "Prefer scenario-based and concrete question (mix conceptual + practical).";

fn nonce_line(nonce: Option<&str>) -> String {
    nonce
        .map(|n| format!("/* UNIQUE_RUN_TOKEN: {} */\n", n))
        .unwrap_or_default()
}

pub fn question_prompt<S: AsRef<str>>(
    role: &str,
    avoid: &[S],
    nonce: Option<&str>,
    variety_hint: Option<&str>,
) -> String {
    let avoid_text = if avoid.is_empty() {
        String::new()
    } else {
        let list = avoid
            .iter()
            .map(|q| q.as_ref())
            .collect::<Vec<_>>()
            .join("\n- ");
        format!(
            "Avoid repeating or paraphrasing these previous questions:\n- {}\n\n",
            list
        )
    };
    let variety = variety_hint
        .filter(|h| !h.trim().is_empty())
        .unwrap_or(DEFAULT_VARIETY_HINT);

    format!(
        r#"{nonce}{avoid}You are an expert interviewer. Produce EXACTLY ONE interview question tailored to the role "{role}". {variety}
Return JSON ONLY (no extra text). The JSON should be an array with a single object that has exactly:
- "q": the question text (string)
- "solution": concise model answer (2-6 sentences, string)

Example:
[
  {{ "q": "Explain X?", "solution": "Short answer." }}
]

Do not include anything else."#,
        nonce = nonce_line(nonce),
        avoid = avoid_text,
        role = role,
        variety = variety,
    )
}

pub fn solution_prompt(question: &str, nonce: Option<&str>) -> String {
    format!(
        r#"{nonce}You are an expert interviewer. Given the interview question below, return ONLY a concise model answer (2-6 sentences). Return JSON ONLY as an object with exactly one field "solution" whose value is the concise answer string.

Question:
{question}

Example:
{{ "solution": "Concise model answer." }}

Do not include any other keys or commentary."#,
        nonce = nonce_line(nonce),
        question = question,
    )
}

pub fn evaluation_prompt(question: &str, answer: &str) -> String {
    format!(
        r#"You are an expert interviewer and evaluator. Score the following answer from 0-10 and provide short bullet points for strengths and improvements. Also include a concise model/ideal answer (2-6 sentences).

Q: {question}
A: {answer}

Return format EXACTLY:
Score: X/10
Strengths:
- ...
Improvements:
- ...
Model answer:
<concise model answer here>"#,
        question = question,
        answer = answer,
    )
}
