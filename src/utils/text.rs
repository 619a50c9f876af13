use std::collections::HashSet;

/// Escapes text for verbatim display inside HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Lowercased word tokens with punctuation treated as whitespace.
pub fn word_set(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

pub fn jaccard(a: &str, b: &str) -> f64 {
    let a = word_set(a);
    let b = word_set(b);
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// Highest Jaccard similarity between `candidate` and any prior question.
pub fn similarity_to_list<S: AsRef<str>>(candidate: &str, prior: &[S]) -> f64 {
    prior
        .iter()
        .map(|p| jaccard(candidate, p.as_ref()))
        .fold(0.0, f64::max)
}

pub fn is_distinct<S: AsRef<str>>(candidate: &str, prior: &[S], threshold: f64) -> bool {
    similarity_to_list(candidate, prior) < threshold
}

/// Blank-line separated paragraphs, trimmed, empties dropped.
pub fn paragraphs(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut offset = 0;
    for line in s.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(st) = start.take() {
                out.push(s[st..end].trim());
            }
        } else {
            if start.is_none() {
                start = Some(offset);
            }
            end = offset + line.len();
        }
        offset += line.len();
    }
    if let Some(st) = start {
        out.push(s[st..end].trim());
    }
    out.retain(|p| !p.is_empty());
    out
}

/// At least one non-empty sentence when split on `.`, `?` or `!`.
pub fn has_sentence(s: &str) -> bool {
    s.split(['.', '?', '!']).any(|part| !part.is_empty())
}
