//! HTML fragments for the practice widget. Every dynamic string is escaped.

use crate::models::feedback::Feedback;
use crate::models::question::Question;
use crate::utils::text::escape_html;

const ANSWER_UNAVAILABLE: &str = "Model answer unavailable.";

fn with_line_breaks(s: &str) -> String {
    escape_html(s).replace('\n', "<br>")
}

/// Question card with a hidden model answer and, when `raw_debug` is
/// non-empty, a collapsible block holding the raw LLM output.
pub fn render_question_card(question: Option<&Question>, raw_debug: &str) -> String {
    let Some(question) = question.filter(|q| q.is_displayable()) else {
        return r#"<div class="card"><div class="qtext">No question available.</div></div>"#
            .to_string();
    };

    let model_answer = if question.needs_model_answer() {
        ANSWER_UNAVAILABLE.to_string()
    } else {
        escape_html(&question.model_answer)
    };

    let debug_block = if raw_debug.trim().is_empty() {
        String::new()
    } else {
        format!(
            r#"<details class="raw"><summary>Show LLM raw output</summary><pre>{}</pre></details>"#,
            escape_html(raw_debug)
        )
    };

    format!(
        r#"<article class="qcard"><div class="qmeta"><div class="qtitle">Interview Question</div><div class="qtext">{}</div></div><div class="model" hidden><pre>{}</pre>{}</div></article>"#,
        escape_html(&question.text),
        model_answer,
        debug_block
    )
}

pub fn render_feedback(feedback: &Feedback) -> String {
    let score = feedback
        .score
        .map(|s| format!(r#"<div class="score"><strong>Score: {}/10</strong></div>"#, s))
        .unwrap_or_default();

    format!(
        r#"<div class="feedback-card">{}<div class="feedback"><strong>AI Feedback</strong><div>{}</div></div><div class="model-answer"><strong>Model Answer</strong><div>{}</div></div></div>"#,
        score,
        with_line_breaks(&feedback.text),
        with_line_breaks(&feedback.model_answer)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_card_escapes_and_hides_empty_debug() {
        let q = Question::new("Is <b> & \"x\" safe?", "");
        let html = render_question_card(Some(&q), "  ");

        assert!(html.contains("Is &lt;b&gt; &amp; &quot;x&quot; safe?"));
        assert!(html.contains(ANSWER_UNAVAILABLE));
        assert!(!html.contains("<details"));
    }

    #[test]
    fn question_card_includes_raw_output() {
        let q = Question::new("What is a monad?", "A monoid in the category of endofunctors.");
        let html = render_question_card(Some(&q), "[{\"q\":\"<x>\"}]");

        assert!(html.contains("A monoid in the category of endofunctors."));
        assert!(html.contains("<pre>[{&quot;q&quot;:&quot;&lt;x&gt;&quot;}]</pre>"));
    }

    #[test]
    fn missing_question_renders_placeholder() {
        assert!(render_question_card(None, "").contains("No question available."));
        let blank = Question::new("  ", "answer");
        assert!(render_question_card(Some(&blank), "").contains("No question available."));
    }

    #[test]
    fn feedback_shows_score_only_when_extracted() {
        let mut feedback = Feedback {
            score: Some(7),
            text: "Score: 7/10\nStrengths:\n- <clear>".into(),
            model_answer: "Use keys.".into(),
            from_fallback: false,
        };
        let html = render_feedback(&feedback);
        assert!(html.contains("<strong>Score: 7/10</strong>"));
        assert!(html.contains("Score: 7/10<br>Strengths:<br>- &lt;clear&gt;"));

        feedback.score = None;
        assert!(!render_feedback(&feedback).contains(r#"class="score""#));
    }
}
