//! Salvage parsing of unreliable LLM output.

use crate::models::question::Question;
use crate::utils::text::{has_sentence, paragraphs};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};

/// Nesting bound for answer search; parsed trees are acyclic so this only caps work.
const MAX_SEARCH_DEPTH: usize = 8;

const MAX_SPAN_STARTS: usize = 32;

const QUESTION_KEYS: &[&str] = &["q", "question", "prompt"];

const DIRECT_ANSWER_KEYS: &[&str] = &[
    "solution",
    "modelAnswer",
    "model_answer",
    "answer",
    "solution_text",
    "model_answer_text",
];

const ANSWER_KEY_PRIORITY: &[&str] = &[
    "solution",
    "modelAnswer",
    "model_answer",
    "answer",
    "model",
    "response",
    "content",
    "text",
    "solution_text",
    "solutionText",
    "answer_text",
];

const SOLUTION_ONLY_KEYS: &[&str] = &["solution", "modelAnswer", "answer"];

static ARRAY_OF_OBJECTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("array pattern compiles"));

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```(?:json)?\s*(.*?)\s*```").expect("fence pattern compiles")
});

/// `Solution:` / `Answer -` / `Model answer:` style label inside free text.
static LABELED_ANSWER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:solution|model answer|answer)\b\s*[:\-]\s*")
        .expect("label pattern compiles")
});

static ANSWER_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:model answer|solution|answer)\b\s*(?::|-|\n)")
        .expect("marker pattern compiles")
});

static LIST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\s*[.)]\s*").expect("list pattern compiles"));

static QUESTION_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:question|q)\s*\d*\s*[:.)\-]\s*").expect("label pattern compiles")
});

static SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Score\s*:\s*([0-9]{1,2})(?:\s*/\s*10)?").expect("score pattern compiles")
});

pub fn parse_question(text: &str) -> Option<Question> {
    if text.trim().is_empty() {
        return None;
    }

    if let Some(items) = extract_json_array(text) {
        if let Some(question) = items.first().and_then(normalize_parsed_object) {
            tracing::debug!("question parsed from JSON array");
            return Some(question);
        }
    }

    if let Some(value) = try_parse_any_json(text) {
        if let Some(question) = normalize_parsed_object(&value) {
            tracing::debug!("question parsed from loose JSON");
            return Some(question);
        }
    }

    let question = parse_question_from_text(text);
    if question.is_some() {
        tracing::debug!("question parsed from free text");
    }
    question
}

/// Finds a JSON array in `text`: whole text, `[ { .. } ]` span, fenced block,
/// then bracket matching.
pub fn extract_json_array(text: &str) -> Option<Vec<JsonValue>> {
    if let Some(items) = parse_array(text.trim()) {
        return Some(items);
    }

    if let Some(m) = ARRAY_OF_OBJECTS.find(text) {
        if let Some(items) = parse_array(m.as_str()) {
            return Some(items);
        }
    }

    if let Some(caps) = FENCED_BLOCK.captures(text) {
        if let Some(items) = caps.get(1).and_then(|body| parse_array(body.as_str().trim())) {
            return Some(items);
        }
    }

    balanced_spans(text, '[', ']').find_map(parse_array)
}

fn parse_array(candidate: &str) -> Option<Vec<JsonValue>> {
    match serde_json::from_str::<JsonValue>(candidate) {
        Ok(JsonValue::Array(items)) => Some(items),
        _ => None,
    }
}

pub fn try_parse_any_json(text: &str) -> Option<JsonValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
        return Some(value);
    }

    let parse = |candidate: &str| serde_json::from_str::<JsonValue>(candidate).ok();

    balanced_spans(text, '{', '}')
        .find_map(parse)
        .or_else(|| balanced_spans(text, '[', ']').find_map(parse))
        .or_else(|| widest_span(text, '{', '}').and_then(parse))
        .or_else(|| widest_span(text, '[', ']').and_then(parse))
}

/// Balanced `open..close` substrings, one per starting bracket, in order.
///
/// Brackets inside JSON string literals do not count towards depth.
fn balanced_spans(text: &str, open: char, close: char) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(move |(_, c)| *c == open)
        .take(MAX_SPAN_STARTS)
        .filter_map(move |(start, _)| {
            balanced_end(&text[start..], open, close).map(|end| &text[start..start + end])
        })
}

fn balanced_end(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(idx + c.len_utf8());
            }
        }
    }
    None
}

fn widest_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..end + close.len_utf8()])
}

pub fn normalize_parsed_object(value: &JsonValue) -> Option<Question> {
    let value = match value {
        JsonValue::Array(items) => items.first()?,
        other => other,
    };
    let obj = value.as_object()?;

    let (question_key, question) = question_field(obj)?;

    let answer = DIRECT_ANSWER_KEYS
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(|v| find_answer_at(v, 0))
        .or_else(|| search_object(obj, 0, Some(question_key)))
        .unwrap_or_default();

    // A whole-object search may still land on a copy of the question.
    let answer = if answer == question { String::new() } else { answer };

    Some(Question::new(question, answer))
}

fn question_field(obj: &Map<String, JsonValue>) -> Option<(&str, String)> {
    for key in QUESTION_KEYS {
        if let Some(text) = obj.get(*key).and_then(JsonValue::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                return Some((*key, text.to_string()));
            }
        }
    }

    obj.iter().find_map(|(key, v)| {
        let text = v.as_str()?.trim();
        (text.chars().count() > 10).then(|| (key.as_str(), text.to_string()))
    })
}

pub fn find_likely_answer(value: &JsonValue) -> Option<String> {
    find_answer_at(value, 0)
}

fn find_answer_at(value: &JsonValue, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        JsonValue::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        JsonValue::Array(items) => items.iter().find_map(|v| find_answer_at(v, depth + 1)),
        JsonValue::Object(map) => search_object(map, depth, None),
        _ => None,
    }
}

fn search_object(map: &Map<String, JsonValue>, depth: usize, skip: Option<&str>) -> Option<String> {
    let allowed = |key: &str| skip != Some(key);

    ANSWER_KEY_PRIORITY
        .iter()
        .filter(|key| allowed(**key))
        .filter_map(|key| map.get(*key))
        .find_map(|v| find_answer_at(v, depth + 1))
        .or_else(|| {
            map.iter()
                .filter(|(key, _)| allowed(key.as_str()))
                .find_map(|(_, v)| find_answer_at(v, depth + 1))
        })
}

pub fn parse_question_from_text(text: &str) -> Option<Question> {
    if text.trim().is_empty() {
        return None;
    }

    if let Some((marker_start, answer)) = trailing_answer(text) {
        let lines = non_empty_lines(&text[..marker_start]);
        let line = pick_question_line(&lines).or_else(|| lines.last().copied())?;
        let question = clean_question_line(line);
        if question.is_empty() {
            return None;
        }
        return Some(Question::new(question, answer));
    }

    let lines = non_empty_lines(text);
    let line = pick_question_line(&lines).or_else(|| lines.first().copied())?;
    let question = clean_question_line(line);
    if question.is_empty() {
        return None;
    }

    let answer = paragraphs(text)
        .into_iter()
        .rev()
        .filter(|p| !p.contains(line))
        .find(|p| plausible_paragraph(p))
        .unwrap_or_default();

    Some(Question::new(question, answer))
}

/// First answer marker whose remainder, up to the end of text, is 10 to 800
/// characters long. Returns the marker offset and the remainder.
fn trailing_answer(text: &str) -> Option<(usize, String)> {
    ANSWER_MARKER.find_iter(text).find_map(|m| {
        let rest = text[m.end()..].trim_start_matches(|c: char| c == ':' || c == '*' || c.is_whitespace());
        let len = rest.chars().count();
        (10..=800)
            .contains(&len)
            .then(|| (m.start(), rest.trim().to_string()))
    })
}

fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

/// Prefers an actual question, then any line long enough to be one that is
/// not a lead-in such as "Here is your question:".
fn pick_question_line<'a>(lines: &[&'a str]) -> Option<&'a str> {
    let long_enough = |line: &&str| clean_question_line(line).chars().count() > 10;

    lines
        .iter()
        .copied()
        .filter(long_enough)
        .find(|l| l.contains('?'))
        .or_else(|| {
            lines
                .iter()
                .copied()
                .filter(long_enough)
                .find(|l| !l.ends_with(':'))
        })
}

fn clean_question_line(line: &str) -> String {
    let line = LIST_NUMBER.replace(line, "");
    let line = QUESTION_LABEL.replace(&line, "");
    line.trim().trim_matches('*').trim().to_string()
}

fn plausible_paragraph(p: &str) -> bool {
    let len = p.chars().count();
    len > 30 && len < 800 && has_sentence(p)
}

/// Pulls an answer out of free text: a labeled section first, then the last
/// plausible paragraph. Empty when nothing qualifies.
pub fn extract_solution_from_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    for m in LABELED_ANSWER.find_iter(text) {
        if let Some(answer) = labeled_section(&text[m.end()..]) {
            return answer;
        }
    }

    paragraphs(text)
        .into_iter()
        .rev()
        .find(|p| plausible_paragraph(p))
        .map(str::to_string)
        .unwrap_or_default()
}

/// Shortest prefix of at least 20 characters that ends at a blank line or at
/// the end of text, capped at 1000 characters.
fn labeled_section(rest: &str) -> Option<String> {
    let mut count = 0usize;
    for (idx, _) in rest.char_indices() {
        if count > 1000 {
            return None;
        }
        if count >= 20 && rest[idx..].starts_with("\n\n") {
            return Some(rest[..idx].trim().to_string()).filter(|s| !s.is_empty());
        }
        count += 1;
    }
    (20..=1000)
        .contains(&count)
        .then(|| rest.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn parse_solution_response(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    if let Some(value) = try_parse_any_json(text) {
        let candidate = match &value {
            JsonValue::Array(items) => items.first(),
            other => Some(other),
        };
        if let Some(candidate) = candidate {
            let found = SOLUTION_ONLY_KEYS
                .iter()
                .filter_map(|key| candidate.get(*key))
                .find_map(find_likely_answer)
                .or_else(|| find_likely_answer(candidate));
            if found.is_some() {
                return found;
            }
        }
    }

    let labeled = extract_solution_from_text(text);
    if !labeled.is_empty() {
        return Some(labeled);
    }

    let paras = paragraphs(text);
    paras
        .iter()
        .find(|p| {
            let len = p.chars().count();
            len > 30 && len < 800
        })
        .or_else(|| paras.first())
        .map(|p| p.to_string())
}

/// Numeric score from `Score: X` or `Score: X/10`.
pub fn extract_score(text: &str) -> Option<u8> {
    SCORE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
