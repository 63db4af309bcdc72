//! Persistence for problem sessions and submissions.
//!
//! `ProblemRepository` is the boundary the session service talks to: insert,
//! select-by-id and select-ordered, plus removing a submission
//! whose progress write failed. `MemoryRepository` keeps everything in
//! tokio `RwLock` maps, the same way challenges used to be kept in memory.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::domain::{ProblemSession, Submission};
use crate::error::AppError;

#[async_trait]
pub trait ProblemRepository: Send + Sync {
  async fn insert_session(&self, session: ProblemSession) -> Result<(), AppError>;
  async fn get_session(&self, id: &str) -> Result<Option<ProblemSession>, AppError>;
  /// Overwrites the stored session (hint cursor updates).
  async fn save_session(&self, session: ProblemSession) -> Result<(), AppError>;
  async fn insert_submission(&self, submission: Submission) -> Result<(), AppError>;
  /// Deletes one submission; a missing id is not an error.
  async fn remove_submission(&self, problem_id: &str, submission_id: &str) -> Result<(), AppError>;
  /// Submissions for one problem, newest first.
  async fn submissions_for(&self, problem_id: &str) -> Result<Vec<Submission>, AppError>;
}

#[derive(Clone, Default)]
pub struct MemoryRepository {
  sessions: Arc<RwLock<HashMap<String, ProblemSession>>>,
  submissions: Arc<RwLock<HashMap<String, Vec<Submission>>>>,
}

impl MemoryRepository {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ProblemRepository for MemoryRepository {
  #[instrument(level = "debug", skip(self, session), fields(id = %session.id))]
  async fn insert_session(&self, session: ProblemSession) -> Result<(), AppError> {
    self.sessions.write().await.insert(session.id.clone(), session);
    Ok(())
  }

  async fn get_session(&self, id: &str) -> Result<Option<ProblemSession>, AppError> {
    Ok(self.sessions.read().await.get(id).cloned())
  }

  async fn save_session(&self, session: ProblemSession) -> Result<(), AppError> {
    let mut sessions = self.sessions.write().await;
    match sessions.get_mut(&session.id) {
      Some(slot) => {
        *slot = session;
        Ok(())
      }
      None => Err(AppError::NotFound(session.id)),
    }
  }

  #[instrument(level = "debug", skip(self, submission), fields(problem_id = %submission.problem_id))]
  async fn insert_submission(&self, submission: Submission) -> Result<(), AppError> {
    self.submissions
      .write()
      .await
      .entry(submission.problem_id.clone())
      .or_default()
      .push(submission);
    Ok(())
  }

  async fn remove_submission(&self, problem_id: &str, submission_id: &str) -> Result<(), AppError> {
    if let Some(subs) = self.submissions.write().await.get_mut(problem_id) {
      subs.retain(|s| s.id != submission_id);
    }
    Ok(())
  }

  async fn submissions_for(&self, problem_id: &str) -> Result<Vec<Submission>, AppError> {
    let subs = self.submissions.read().await;
    Ok(subs.get(problem_id).map(|v| v.iter().rev().cloned().collect()).unwrap_or_default())
  }
}
