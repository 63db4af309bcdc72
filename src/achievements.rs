//! Achievement evaluation.
//!
//! Achievements are checked against the current cumulative stats after every submission.
//! Unlocking is one-way: an entry that is already unlocked keeps its original timestamp.

use chrono::{DateTime, Utc};

use crate::domain::{Achievement, AchievementId, UserStats};

/// Unlock predicate for one achievement.
///
/// NOTE: `HintMaster` only looks at `total`; hint usage is not tracked in the stats.
pub fn is_met(id: AchievementId, stats: &UserStats) -> bool {
  match id {
    AchievementId::FirstProblem => stats.total >= 1,
    AchievementId::QuickLearner => stats.correct >= 5,
    AchievementId::HotStreak => stats.streak >= 3,
    AchievementId::MathMaster => stats.total >= 10,
    AchievementId::PerfectScore => stats.total >= 5 && stats.correct == stats.total,
    AchievementId::HintMaster => stats.total >= 3,
    AchievementId::SpeedDemon => stats.streak >= 5,
    AchievementId::ProblemSolver => stats.total >= 20,
  }
}

/// All achievements, locked.
pub fn default_set() -> Vec<Achievement> {
  AchievementId::ALL.iter().map(|id| Achievement::locked(*id)).collect()
}

/// Returns the full, updated achievement set in canonical order.
/// Entries missing from `prior` start locked; newly unlocked ones get `now`.
pub fn evaluate(stats: &UserStats, prior: &[Achievement], now: DateTime<Utc>) -> Vec<Achievement> {
  AchievementId::ALL
    .iter()
    .map(|id| {
      let current = prior
        .iter()
        .find(|a| a.id == *id)
        .cloned()
        .unwrap_or_else(|| Achievement::locked(*id));
      if current.unlocked || !is_met(*id, stats) {
        current
      } else {
        Achievement { id: *id, unlocked: true, unlocked_at: Some(now) }
      }
    })
    .collect()
}

/// Ids unlocked in `after` that were not unlocked in `before`.
pub fn newly_unlocked(before: &[Achievement], after: &[Achievement]) -> Vec<AchievementId> {
  after
    .iter()
    .filter(|a| a.unlocked)
    .filter(|a| !before.iter().any(|b| b.id == a.id && b.unlocked))
    .map(|a| a.id)
    .collect()
}
