//! Text-generation capability and the strict parser for generated problems.
//!
//! The service never trusts model output: `parse_problem` extracts the first JSON
//! object, validates its shape, and anything that fails turns into the fallback problem.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::config::Prompts;
use crate::domain::{Difficulty, Operation, Problem, ProblemSource};
use crate::error::AppError;
use crate::seeds::fallback_problem;
use crate::util::{extract_json_object, fill_template, trunc_for_log};

pub const HINT_COUNT: usize = 3;

/// Anything that can turn a prompt into text (OpenAI client in production, stubs in tests).
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate_text(&self, prompt: &str) -> Result<String, AppError>;
}

/// Raw shape requested from the model.
#[derive(Debug, Deserialize)]
struct GeneratedProblem {
  problem_text: String,
  final_answer: f64,
  #[serde(default)]
  steps: Vec<String>,
  #[serde(default)]
  hints: Vec<String>,
}

/// Why a model reply was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
  #[error("no JSON object in reply")]
  NoJsonObject,
  #[error("invalid JSON: {0}")]
  InvalidJson(String),
  #[error("empty problem text")]
  EmptyText,
  #[error("final answer is not a finite number")]
  NonFiniteAnswer,
  #[error("no solution steps")]
  MissingSteps,
  #[error("expected 3 hints, got {0}")]
  WrongHintCount(usize),
  #[error("hint {0} is blank")]
  BlankHint(usize),
}

pub fn build_problem_prompt(prompts: &Prompts, difficulty: Difficulty, operation: Operation) -> String {
  let (lo, hi) = difficulty.number_range();
  let range = format!("{lo} and {hi}");
  let operation_text = match operation {
    Operation::Mixed => "any one of addition, subtraction, multiplication or division".to_string(),
    op => op.as_str().to_string(),
  };
  fill_template(
    &prompts.problem_template,
    &[("difficulty", difficulty.as_str()), ("range", &range), ("operation", &operation_text)],
  )
}

/// Strict validation of a model reply. Pure, so it is tested without any network.
pub fn validate_problem(
  text: &str,
  difficulty: Difficulty,
  operation: Operation,
) -> Result<Problem, SchemaError> {
  let json = extract_json_object(text).ok_or(SchemaError::NoJsonObject)?;
  let raw: GeneratedProblem =
    serde_json::from_str(json).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;

  let problem_text = raw.problem_text.trim().to_string();
  if problem_text.is_empty() {
    return Err(SchemaError::EmptyText);
  }
  if !raw.final_answer.is_finite() {
    return Err(SchemaError::NonFiniteAnswer);
  }
  let steps: Vec<String> = raw.steps.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
  if steps.is_empty() {
    return Err(SchemaError::MissingSteps);
  }
  if raw.hints.len() != HINT_COUNT {
    return Err(SchemaError::WrongHintCount(raw.hints.len()));
  }
  let hints: Vec<String> = raw.hints.into_iter().map(|s| s.trim().to_string()).collect();
  if let Some(i) = hints.iter().position(|h| h.is_empty()) {
    return Err(SchemaError::BlankHint(i + 1));
  }

  Ok(Problem {
    problem_text,
    correct_answer: raw.final_answer,
    difficulty,
    operation,
    steps,
    hints,
    source: ProblemSource::Generated,
  })
}

/// Like `validate_problem`, but never fails: rejected replies become the fallback problem.
pub fn parse_problem(text: &str, difficulty: Difficulty, operation: Operation) -> Problem {
  match validate_problem(text, difficulty, operation) {
    Ok(p) => p,
    Err(reason) => {
      warn!(target: "problem", %reason, reply = %trunc_for_log(text, 120), "Rejected model reply; using fallback problem");
      fallback_problem()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const GOOD: &str = r#"Here is your problem:
{
  "problem_text": "Sarah has 24 stickers. She gives 8 to Emma and buys 12 more. How many does she have?",
  "final_answer": 28,
  "steps": ["24 - 8 = 16", "16 + 12 = 28"],
  "hints": ["What happens when she gives some away?", "Subtract first.", "Then add the 12 new ones."]
}"#;

  #[test]
  fn accepts_well_formed_reply() {
    let p = parse_problem(GOOD, Difficulty::Medium, Operation::Mixed);
    assert_eq!(p.source, ProblemSource::Generated);
    assert_eq!(p.correct_answer, 28.0);
    assert_eq!(p.hints.len(), 3);
    assert_eq!(p.steps.len(), 2);
    assert_eq!(p.difficulty, Difficulty::Medium);
  }

  #[test]
  fn malformed_reply_yields_fallback() {
    for bad in [
      "I'm sorry, I can't do that.",
      r#"{"problem_text": "Tom has 5 apples", "final_answer": "#,
      r#"{"problem_text": "Tom has 5 apples", "final_answer": "five"}"#,
    ] {
      let p = parse_problem(bad, Difficulty::Hard, Operation::Division);
      assert_eq!(p.correct_answer, 18.0);
      assert_eq!(p.source, ProblemSource::Fallback);
    }
  }

  #[test]
  fn schema_violations_are_reported() {
    let two_hints = r#"{"problem_text": "x", "final_answer": 1, "steps": ["a"], "hints": ["a", "b"]}"#;
    assert_eq!(
      validate_problem(two_hints, Difficulty::Easy, Operation::Addition).unwrap_err(),
      SchemaError::WrongHintCount(2)
    );
    let four_with_blank = r#"{"problem_text": "x", "final_answer": 1, "steps": ["a"], "hints": ["a", " ", "b", "c"]}"#;
    assert_eq!(
      validate_problem(four_with_blank, Difficulty::Easy, Operation::Addition).unwrap_err(),
      SchemaError::WrongHintCount(4)
    );
    let blank_hint = r#"{"problem_text": "x", "final_answer": 1, "steps": ["a"], "hints": ["a", "", "c"]}"#;
    assert_eq!(
      validate_problem(blank_hint, Difficulty::Easy, Operation::Addition).unwrap_err(),
      SchemaError::BlankHint(2)
    );
    let no_steps = r#"{"problem_text": "x", "final_answer": 1, "hints": ["a", "b", "c"]}"#;
    assert_eq!(
      validate_problem(no_steps, Difficulty::Easy, Operation::Addition).unwrap_err(),
      SchemaError::MissingSteps
    );
    let blank = r#"{"problem_text": "  ", "final_answer": 1, "steps": ["a"], "hints": ["a", "b", "c"]}"#;
    assert_eq!(
      validate_problem(blank, Difficulty::Easy, Operation::Addition).unwrap_err(),
      SchemaError::EmptyText
    );
  }

  #[test]
  fn prompt_carries_range_and_operation() {
    let prompts = Prompts::default();
    let p = build_problem_prompt(&prompts, Difficulty::Hard, Operation::Multiplication);
    assert!(p.contains("1 and 1000"));
    assert!(p.contains("multiplication"));
    let mixed = build_problem_prompt(&prompts, Difficulty::Easy, Operation::Mixed);
    assert!(mixed.contains("1 and 20"));
    assert!(mixed.contains("addition, subtraction, multiplication or division"));
  }
}
