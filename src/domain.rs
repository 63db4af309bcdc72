//! Domain models: problems, submissions, per-user stats, achievements and history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Difficulty selected by the student. Drives the numeric range in the generation prompt.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  #[default]
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }

  /// Inclusive range of numbers the model should stay within.
  pub fn number_range(&self) -> (u32, u32) {
    match self {
      Difficulty::Easy => (1, 20),
      Difficulty::Medium => (1, 100),
      Difficulty::Hard => (1, 1000),
    }
  }
}

/// Arithmetic operation filter. `Mixed` lets the model pick any of the four.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  Addition,
  Subtraction,
  Multiplication,
  Division,
  #[default]
  Mixed,
}

impl Operation {
  pub fn as_str(&self) -> &'static str {
    match self {
      Operation::Addition => "addition",
      Operation::Subtraction => "subtraction",
      Operation::Multiplication => "multiplication",
      Operation::Division => "division",
      Operation::Mixed => "mixed",
    }
  }
}

/// Where a problem came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProblemSource {
  Generated,
  Fallback,
}

/// A generated word problem. Immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Problem {
  pub problem_text: String,
  pub correct_answer: f64,
  pub difficulty: Difficulty,
  pub operation: Operation,
  pub steps: Vec<String>,
  pub hints: Vec<String>,
  pub source: ProblemSource,
}

/// Persisted problem instance plus its mutable hint counters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProblemSession {
  pub id: String,
  pub problem: Problem,
  /// Cursor into `problem.hints`.
  pub hints_revealed: usize,
  /// Hints written by the model after a wrong answer.
  #[serde(default)]
  pub ai_hints: usize,
  pub created_at: DateTime<Utc>,
}

impl ProblemSession {
  pub fn hints_used(&self) -> usize {
    self.hints_revealed + self.ai_hints
  }
}

/// One answer check. Written once, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
  pub id: String,
  pub problem_id: String,
  pub user_answer: f64,
  pub is_correct: bool,
  pub hints_used: u32,
  pub feedback_text: String,
  pub difficulty: Difficulty,
  pub operation: Operation,
  pub created_at: DateTime<Utc>,
}

/// Cumulative counters for one user. `correct <= total` and `streak <= total` always hold.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
  pub correct: u32,
  pub total: u32,
  pub streak: u32,
}

/// The closed set of achievements.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AchievementId {
  FirstProblem,
  QuickLearner,
  HotStreak,
  MathMaster,
  PerfectScore,
  HintMaster,
  SpeedDemon,
  ProblemSolver,
}

impl AchievementId {
  pub const ALL: [AchievementId; 8] = [
    AchievementId::FirstProblem,
    AchievementId::QuickLearner,
    AchievementId::HotStreak,
    AchievementId::MathMaster,
    AchievementId::PerfectScore,
    AchievementId::HintMaster,
    AchievementId::SpeedDemon,
    AchievementId::ProblemSolver,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      AchievementId::FirstProblem => "first-problem",
      AchievementId::QuickLearner => "quick-learner",
      AchievementId::HotStreak => "hot-streak",
      AchievementId::MathMaster => "math-master",
      AchievementId::PerfectScore => "perfect-score",
      AchievementId::HintMaster => "hint-master",
      AchievementId::SpeedDemon => "speed-demon",
      AchievementId::ProblemSolver => "problem-solver",
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
  pub id: AchievementId,
  pub unlocked: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unlocked_at: Option<DateTime<Utc>>,
}

impl Achievement {
  pub fn locked(id: AchievementId) -> Self {
    Self { id, unlocked: false, unlocked_at: None }
  }
}

/// Denormalized submission + problem snapshot shown in the history view.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
  pub id: String,
  pub problem_id: String,
  pub problem_text: String,
  pub user_answer: f64,
  pub correct_answer: f64,
  pub is_correct: bool,
  pub difficulty: Difficulty,
  pub problem_type: Operation,
  pub hints_used: u32,
  pub total_hints: u32,
  pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
  pub fn from_submission(sub: &Submission, problem: &Problem) -> Self {
    Self {
      id: sub.id.clone(),
      problem_id: sub.problem_id.clone(),
      problem_text: problem.problem_text.clone(),
      user_answer: sub.user_answer,
      correct_answer: problem.correct_answer,
      is_correct: sub.is_correct,
      difficulty: problem.difficulty,
      problem_type: problem.operation,
      hints_used: sub.hints_used,
      total_hints: problem.hints.len() as u32,
      created_at: sub.created_at,
    }
  }
}

/// Per-user identity record, refreshed on each visit.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
  pub session_id: String,
  pub created_at: DateTime<Utc>,
  pub last_active_at: DateTime<Utc>,
}
