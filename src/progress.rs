//! Per-user progress: session identity, cumulative stats, achievements and bounded history.
//!
//! Everything lives behind an injected `ProgressStorage`. The identity record sits under
//! `<user>:session`; stats, achievements and history share one `<user>:progress` document so a
//! submission is committed by a single `put` or not at all.
//! A corrupt value is logged and replaced by its default instead of failing the request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::achievements;
use crate::domain::{Achievement, AchievementId, HistoryEntry, UserSession, UserStats};
use crate::error::AppError;
use crate::history::HistoryLog;
use crate::stats;
use crate::storage::ProgressStorage;

const KEY_SESSION: &str = "session";
const KEY_PROGRESS: &str = "progress";

/// Everything the stats/history views need for one user. Stored as one JSON document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
  #[serde(default)]
  pub stats: UserStats,
  #[serde(default)]
  pub achievements: Vec<Achievement>,
  #[serde(default)]
  pub history: HistoryLog,
}

impl ProgressSnapshot {
  /// Repairs what storage handed back: clamped stats, all 8 achievements, bounded history.
  fn normalized(self) -> Self {
    let achievements = if self.achievements.is_empty() {
      achievements::default_set()
    } else {
      // re-evaluating against zero stats only fills in missing ids
      achievements::evaluate(&UserStats::default(), &self.achievements, Utc::now())
    };
    Self {
      stats: stats::sanitize(self.stats),
      achievements,
      history: self.history.bounded(),
    }
  }
}

/// Result of folding one submission into a user's progress.
#[derive(Clone, Debug)]
pub struct ProgressUpdate {
  pub stats: UserStats,
  pub achievements: Vec<Achievement>,
  pub newly_unlocked: Vec<AchievementId>,
}

#[derive(Clone)]
pub struct UserProgressStore {
  storage: Arc<dyn ProgressStorage>,
}

impl UserProgressStore {
  pub fn new(storage: Arc<dyn ProgressStorage>) -> Self {
    Self { storage }
  }

  /// New opaque user identity.
  pub fn new_user_id() -> String {
    format!("user_{}", Uuid::new_v4().simple())
  }

  fn key(user: &str, kind: &str) -> String {
    format!("{user}:{kind}")
  }

  async fn load<T: DeserializeOwned + Default>(&self, user: &str, kind: &str) -> Result<T, AppError> {
    let Some(raw) = self.storage.get(&Self::key(user, kind)).await? else {
      return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
      Ok(v) => Ok(v),
      Err(e) => {
        warn!(target: "progress", %user, kind, error = %e, "Corrupt stored value; using default");
        Ok(T::default())
      }
    }
  }

  async fn save<T: Serialize>(&self, user: &str, kind: &str, value: &T) -> Result<(), AppError> {
    let raw = serde_json::to_string(value).map_err(|e| AppError::Storage(e.to_string()))?;
    self.storage.put(&Self::key(user, kind), raw).await
  }

  /// Creates the identity record on first sight, otherwise refreshes `last_active_at`.
  #[instrument(level = "debug", skip(self))]
  pub async fn touch(&self, user: &str, now: DateTime<Utc>) -> Result<UserSession, AppError> {
    let existing: Option<UserSession> = self.load(user, KEY_SESSION).await?;
    let session = match existing {
      Some(s) => UserSession { last_active_at: now, ..s },
      None => {
        info!(target: "progress", %user, "New user session");
        UserSession { session_id: user.to_string(), created_at: now, last_active_at: now }
      }
    };
    self.save(user, KEY_SESSION, &session).await?;
    Ok(session)
  }

  pub async fn snapshot(&self, user: &str) -> Result<ProgressSnapshot, AppError> {
    Ok(self.load::<ProgressSnapshot>(user, KEY_PROGRESS).await?.normalized())
  }

  /// Stats update, then achievement evaluation, then history append, written in one `put`.
  #[instrument(level = "info", skip(self, entry), fields(%user, correct = entry.is_correct))]
  pub async fn record(&self, user: &str, entry: HistoryEntry, now: DateTime<Utc>) -> Result<ProgressUpdate, AppError> {
    let prior = self.snapshot(user).await?;

    let new_stats = stats::update(prior.stats, entry.is_correct);
    let new_achievements = achievements::evaluate(&new_stats, &prior.achievements, now);
    let newly_unlocked = achievements::newly_unlocked(&prior.achievements, &new_achievements);
    let mut history = prior.history;
    history.append(entry);

    let next = ProgressSnapshot { stats: new_stats, achievements: new_achievements, history };
    self.save(user, KEY_PROGRESS, &next).await?;

    debug!(target: "progress", %user, history_len = next.history.len(), total = new_stats.total, "Progress saved");
    if !newly_unlocked.is_empty() {
      let ids: Vec<&str> = newly_unlocked.iter().map(|id| id.as_str()).collect();
      info!(target: "progress", %user, unlocked = ?ids, "Achievements unlocked");
    }
    Ok(ProgressUpdate { stats: new_stats, achievements: next.achievements, newly_unlocked })
  }

  /// Drops everything stored for `user`.
  #[instrument(level = "info", skip(self))]
  pub async fn clear(&self, user: &str) -> Result<(), AppError> {
    for kind in [KEY_SESSION, KEY_PROGRESS] {
      self.storage.remove(&Self::key(user, kind)).await?;
    }
    Ok(())
  }
}
