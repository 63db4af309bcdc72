//! HTTP endpoint handlers. These are thin wrappers that forward to the services.
//! Each handler is instrumented and logs the action and basic result info.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::IntoResponse, response::Response, Json};
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::domain::{Difficulty, HistoryEntry, Operation};
use crate::error::AppError;
use crate::progress::UserProgressStore;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// Single action endpoint: `generate | submit | getHistory | getHint | resetProgress`.
#[instrument(level = "info", skip_all)]
pub async fn http_post_math_problem(
  State(state): State<Arc<AppState>>,
  body: Bytes,
) -> Result<Response, AppError> {
  let req: ActionRequest = serde_json::from_slice(&body).map_err(|e| {
    debug!(target: "mathpractice_backend", error = %e, "Rejected request body");
    AppError::BadRequest("Invalid action".into())
  })?;

  let user_id = req.user_id().map(str::to_string).unwrap_or_else(UserProgressStore::new_user_id);
  state.progress.touch(&user_id, Utc::now()).await?;

  let res = match req {
    ActionRequest::Generate { difficulty, problem_type, .. } => generate(&state, user_id, difficulty, problem_type).await?,
    ActionRequest::Submit { session_id, user_answer, hints_used, .. } => submit(&state, user_id, &session_id, user_answer, hints_used).await?,
    ActionRequest::GetHistory { .. } => history(&state, user_id).await?,
    ActionRequest::GetHint { session_id, .. } => hint(&state, user_id, &session_id).await?,
    ActionRequest::ResetProgress { .. } => reset(&state, user_id).await?,
  };
  Ok(res)
}

async fn generate(state: &AppState, user_id: String, difficulty: Difficulty, operation: Operation) -> Result<Response, AppError> {
  let session = state.sessions.generate(difficulty, operation).await?;
  info!(target: "problem", id = %session.id, %user_id, source = ?session.problem.source, "Problem served");
  Ok(Json(GenerateOut {
    success: true,
    user_id,
    session_id: session.id.clone(),
    source: session.problem.source,
    problem: to_out(&session),
  }).into_response())
}

/// validate, persist submission, then stats -> achievements -> history for the user.
/// A failed progress write retracts the submission so the problem stays open for a retry.
async fn submit(state: &AppState, user_id: String, session_id: &str, user_answer: f64, hints_used: u32) -> Result<Response, AppError> {
  if !user_answer.is_finite() {
    return Err(AppError::BadRequest("Answer must be a number".into()));
  }
  let outcome = state.sessions.submit_answer(session_id, user_answer, hints_used).await?;
  let entry = HistoryEntry::from_submission(&outcome.submission, &outcome.problem);
  let update = match state.progress.record(&user_id, entry, outcome.submission.created_at).await {
    Ok(update) => update,
    Err(e) => {
      state.sessions.retract(&outcome.submission).await;
      return Err(e);
    }
  };
  info!(target: "problem", id = %session_id, %user_id, correct = outcome.submission.is_correct, total = update.stats.total, "Submission recorded");
  Ok(Json(SubmitOut {
    success: true,
    user_id,
    is_correct: outcome.submission.is_correct,
    feedback: outcome.submission.feedback_text,
    score: update.stats,
    achievements: update.achievements,
    new_achievements: update.newly_unlocked,
  }).into_response())
}

async fn history(state: &AppState, user_id: String) -> Result<Response, AppError> {
  let snap = state.progress.snapshot(&user_id).await?;
  Ok(Json(HistoryOut {
    success: true,
    user_id,
    score: snap.stats,
    history: snap.history.list().to_vec(),
    achievements: snap.achievements,
  }).into_response())
}

async fn hint(state: &AppState, user_id: String, session_id: &str) -> Result<Response, AppError> {
  let h = state.sessions.hint(session_id).await?;
  info!(target: "problem", id = %session_id, index = h.index, source = ?h.source, "Hint served");
  Ok(Json(HintOut {
    success: true,
    user_id,
    hint: h.text,
    hint_index: h.index,
    total_hints: h.total,
    source: h.source,
  }).into_response())
}

async fn reset(state: &AppState, user_id: String) -> Result<Response, AppError> {
  state.progress.clear(&user_id).await?;
  info!(target: "progress", %user_id, "Progress reset");
  Ok(Json(ResetOut { success: true, user_id }).into_response())
}
