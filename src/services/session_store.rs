use crate::error::{Error, Result};
use crate::models::session::SessionContext;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    context: SessionContext,
    generation: u64,
}

/// What a question flow runs against: a private copy of the session and the
/// generation number that must still be current when it commits.
#[derive(Debug, Clone)]
pub struct FlowTicket {
    pub generation: u64,
    pub snapshot: SessionContext,
}

/// Holds the single practice session.
///
/// Flows never hold the lock across LLM calls. Each start/regenerate takes a
/// ticket, works on the snapshot, and commits; only the most recently issued
/// ticket may commit.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn begin(&self) -> FlowTicket {
        let mut guard = self.inner.lock().await;
        guard.generation += 1;
        FlowTicket {
            generation: guard.generation,
            snapshot: guard.context.clone(),
        }
    }

    pub async fn commit(&self, generation: u64, context: SessionContext) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.generation != generation {
            tracing::warn!(
                generation,
                latest = guard.generation,
                "discarding result of superseded flow"
            );
            return Err(Error::Conflict(
                "A newer question request replaced this one".to_string(),
            ));
        }
        guard.context = context;
        Ok(())
    }

    pub async fn snapshot(&self) -> SessionContext {
        self.inner.lock().await.context.clone()
    }

    /// Overwrites the raw-text slot without touching the generation.
    pub async fn record_raw(&self, raw: &str) {
        self.inner.lock().await.context.last_raw = raw.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;

    #[tokio::test]
    async fn latest_ticket_commits() {
        let store = SessionStore::new();
        let mut ticket = store.begin().await;
        ticket.snapshot.issue(Question::new("What is a futex?", ""));

        store.commit(ticket.generation, ticket.snapshot).await.unwrap();

        let ctx = store.snapshot().await;
        assert_eq!(ctx.previous_questions, vec!["What is a futex?".to_string()]);
    }

    #[tokio::test]
    async fn superseded_ticket_is_rejected() {
        let store = SessionStore::new();
        let mut older = store.begin().await;
        let mut newer = store.begin().await;

        newer.snapshot.issue(Question::new("Newer question?", ""));
        store.commit(newer.generation, newer.snapshot).await.unwrap();

        older.snapshot.issue(Question::new("Older question?", ""));
        let err = store.commit(older.generation, older.snapshot).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let ctx = store.snapshot().await;
        assert_eq!(
            ctx.current_question.map(|q| q.text),
            Some("Newer question?".to_string())
        );
    }

    #[tokio::test]
    async fn record_raw_does_not_invalidate_tickets() {
        let store = SessionStore::new();
        let ticket = store.begin().await;
        store.record_raw("evaluation reply").await;
        assert!(store.commit(ticket.generation, ticket.snapshot).await.is_ok());
    }
}
