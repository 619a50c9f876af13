//! Canned questions used when the backend produces nothing usable.

use crate::models::question::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleBucket {
    Frontend,
    Backend,
    MachineLearning,
    General,
}

impl RoleBucket {
    /// Keyword match on the lowercased role, first bucket wins.
    pub fn for_role(role: &str) -> Self {
        let role = role.to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| role.contains(w));

        if any(&["react", "frontend", "ui"]) {
            RoleBucket::Frontend
        } else if any(&["backend", "node", "api", "server"]) {
            RoleBucket::Backend
        } else if any(&["ml", "data", "machine"]) {
            RoleBucket::MachineLearning
        } else {
            RoleBucket::General
        }
    }

    fn entries(self) -> &'static [(&'static str, &'static str)] {
        match self {
            RoleBucket::Frontend => FRONTEND,
            RoleBucket::Backend => BACKEND,
            RoleBucket::MachineLearning => MACHINE_LEARNING,
            RoleBucket::General => GENERAL,
        }
    }
}

const FRONTEND: &[(&str, &str)] = &[
    (
        "Explain React reconciliation and the role of keys in lists.",
        "Reconciliation compares virtual DOM trees to compute minimal updates; keys help React match elements between renders to avoid unnecessary reordering and re-renders.",
    ),
    (
        "How would you optimize rendering for a large list in React?",
        "Use list virtualization/windowing, memoize item components, avoid creating new props inline, and lazy-load images.",
    ),
    (
        "Explain differences between useEffect and useLayoutEffect.",
        "useEffect runs after painting; useLayoutEffect runs synchronously after DOM mutations but before paint, which makes it useful for measuring layout.",
    ),
];

const BACKEND: &[(&str, &str)] = &[
    (
        "Design an API to handle high write throughput — what patterns would you use?",
        "Use partitioning/sharding, asynchronous processing (queues), idempotency, batching, and backpressure; choose storage that scales horizontally.",
    ),
    (
        "How would you implement authentication and authorization for microservices?",
        "Use centralized identity (OAuth/OIDC), short-lived JWTs for service-to-service calls, and fine-grained scopes for authorization.",
    ),
    (
        "Explain trade-offs between SQL and NoSQL for a new product.",
        "SQL offers ACID transactions and complex queries; NoSQL scales horizontally and handles diverse schemas but may sacrifice relational constraints.",
    ),
];

const MACHINE_LEARNING: &[(&str, &str)] = &[
    (
        "How do you prevent data leakage when training ML models?",
        "Split train/test by time/entities, fit preprocessors only on training data, and avoid using future information in features.",
    ),
    (
        "Explain bias-variance tradeoff and ways to diagnose it.",
        "Bias = underfitting, variance = overfitting. Use learning curves, cross-validation, and regularization to diagnose/tune.",
    ),
    (
        "What are steps to deploy an ML model to production?",
        "Containerize the model, expose an inference API, add monitoring, implement versioning, and define rollback strategies.",
    ),
];

const GENERAL: &[(&str, &str)] = &[
    (
        "Explain the Virtual DOM and why frameworks use it.",
        "Virtual DOM is an in-memory representation that allows frameworks to compute minimal updates and avoid expensive direct DOM manipulations.",
    ),
    (
        "Describe the JavaScript event loop and microtasks vs macrotasks.",
        "The event loop handles call stack and task queues; microtasks (promises) run before the next macrotask/paint.",
    ),
    (
        "How would you debug a performance bottleneck in an application?",
        "Profile with browser/devtools, measure network/db calls, identify hot functions, and apply targeted fixes like memoization or caching.",
    ),
];

pub fn questions_for_role(role: &str) -> Vec<Question> {
    RoleBucket::for_role(role)
        .entries()
        .iter()
        .map(|(q, a)| Question::new(*q, *a))
        .collect()
}

/// The bucket's first question.
pub fn first_for_role(role: &str) -> Question {
    let (q, a) = RoleBucket::for_role(role).entries()[0];
    Question::new(q, a)
}

/// First bucket entry not in `asked`, else the bucket's first entry.
pub fn first_unused_for_role<S: AsRef<str>>(role: &str, asked: &[S]) -> Question {
    questions_for_role(role)
        .into_iter()
        .find(|q| !asked.iter().any(|a| a.as_ref() == q.text))
        .unwrap_or_else(|| first_for_role(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_to_keyword_buckets() {
        assert_eq!(RoleBucket::for_role("Senior React Developer"), RoleBucket::Frontend);
        assert_eq!(RoleBucket::for_role("Node.js engineer"), RoleBucket::Backend);
        assert_eq!(RoleBucket::for_role("Data Scientist"), RoleBucket::MachineLearning);
        assert_eq!(RoleBucket::for_role("Product Manager"), RoleBucket::General);
        // substring match, as "build" contains "ui"
        assert_eq!(RoleBucket::for_role("Build engineer"), RoleBucket::Frontend);
    }

    #[test]
    fn every_bucket_has_answered_questions() {
        for role in ["react", "backend", "ml", "other"] {
            let questions = questions_for_role(role);
            assert_eq!(questions.len(), 3);
            assert!(questions.iter().all(|q| q.is_displayable() && !q.needs_model_answer()));
        }
    }

    #[test]
    fn first_unused_skips_asked_questions() {
        let asked = vec!["Explain React reconciliation and the role of keys in lists.".to_string()];
        let q = first_unused_for_role("frontend", &asked);
        assert_eq!(q.text, "How would you optimize rendering for a large list in React?");
    }

    #[test]
    fn first_unused_wraps_to_first_when_exhausted() {
        let asked: Vec<String> = questions_for_role("frontend").into_iter().map(|q| q.text).collect();
        let q = first_unused_for_role("frontend", &asked);
        assert_eq!(q, first_for_role("frontend"));
    }
}
