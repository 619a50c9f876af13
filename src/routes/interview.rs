use axum::{extract::State, response::Json};
use validator::Validate;

use crate::dto::interview_dto::{
    FeedbackResponse, QuestionRequest, QuestionResponse, SessionResponse, SubmitAnswerRequest,
};
use crate::error::Result;
use crate::services::render_service::{render_feedback, render_question_card};
use crate::AppState;

#[axum::debug_handler]
pub async fn start(
    State(state): State<AppState>,
    Json(payload): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>> {
    payload.validate()?;
    let mut ticket = state.sessions.begin().await;
    tracing::info!(generation = ticket.generation, "start interview");

    let outcome = state
        .interview
        .start_interview(&mut ticket.snapshot, payload.role.as_deref())
        .await;
    let html = render_question_card(Some(&outcome.question), &ticket.snapshot.last_raw);

    state
        .sessions
        .commit(ticket.generation, ticket.snapshot)
        .await?;
    Ok(Json(QuestionResponse::new(outcome, html)))
}

#[axum::debug_handler]
pub async fn regenerate(
    State(state): State<AppState>,
    Json(payload): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>> {
    payload.validate()?;
    let mut ticket = state.sessions.begin().await;
    tracing::info!(generation = ticket.generation, "regenerate question");

    let outcome = state
        .interview
        .regenerate_question(&mut ticket.snapshot, payload.role.as_deref())
        .await;
    let html = render_question_card(Some(&outcome.question), &ticket.snapshot.last_raw);

    state
        .sessions
        .commit(ticket.generation, ticket.snapshot)
        .await?;
    Ok(Json(QuestionResponse::new(outcome, html)))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<FeedbackResponse>> {
    payload.validate()?;
    let mut session = state.sessions.snapshot().await;

    let feedback = state
        .interview
        .evaluate_answer(&mut session, &payload.answer)
        .await?;
    state.sessions.record_raw(&session.last_raw).await;

    let html = render_feedback(&feedback);
    Ok(Json(FeedbackResponse::new(feedback, html)))
}

#[axum::debug_handler]
pub async fn current(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.sessions.snapshot().await;
    let html = render_question_card(session.current_question.as_ref(), &session.last_raw);
    Json(SessionResponse {
        current_question: session.current_question,
        previous_questions: session.previous_questions,
        last_raw: session.last_raw,
        html,
    })
}
