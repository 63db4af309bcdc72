//! Cumulative stats update applied after every submission.

use crate::domain::UserStats;

/// `total += 1`, `correct += 1` on a correct answer, and the streak either grows or resets to 0.
pub fn update(prior: UserStats, is_correct: bool) -> UserStats {
  UserStats {
    correct: prior.correct.saturating_add(u32::from(is_correct)),
    total: prior.total.saturating_add(1),
    streak: if is_correct { prior.streak.saturating_add(1) } else { 0 },
  }
}

/// Repairs counters loaded from storage that break `correct <= total` / `streak <= total`.
pub fn sanitize(stats: UserStats) -> UserStats {
  UserStats {
    correct: stats.correct.min(stats.total),
    total: stats.total,
    streak: stats.streak.min(stats.total),
  }
}
