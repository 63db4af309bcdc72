//! Loading application configuration (prompts, feedback mode, progress storage) from TOML.
//!
//! Every section is optional; see `AppConfig` for the schema.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub feedback: FeedbackCfg,
  #[serde(default)]
  pub progress: ProgressCfg,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FeedbackCfg {
  /// Ask the model for personalized feedback on every submission.
  #[serde(default)]
  pub ai_feedback: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
  #[default]
  Memory,
  File,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProgressCfg {
  #[serde(default)]
  pub storage: StorageKind,
  #[serde(default = "default_progress_dir")]
  pub dir: PathBuf,
}

impl Default for ProgressCfg {
  fn default() -> Self {
    Self { storage: StorageKind::default(), dir: default_progress_dir() }
  }
}

fn default_progress_dir() -> PathBuf {
  PathBuf::from("./data/progress")
}

/// Prompts sent to the text generator. Defaults target Primary 5 students (ages 10-11).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub tutor_system: String,
  /// Placeholders: {difficulty}, {range}, {operation}
  pub problem_template: String,
  /// Placeholders: {problem}, {correct_answer}, {user_answer}, {is_correct}
  pub feedback_template: String,
  /// Placeholders: {problem}, {user_answer}
  pub hint_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      tutor_system: "You are a friendly, encouraging math tutor for Primary 5 students (ages 10-11).".into(),
      problem_template: r#"Generate a {difficulty} math word problem suitable for Primary 5 students (ages 10-11).
Operation: {operation}. Use whole numbers between {range}. Make it engaging and relatable to children.

Return your response as a JSON object with exactly this format:
{
  "problem_text": "The word problem text here",
  "final_answer": <numeric answer only>,
  "steps": ["Step 1 ...", "Step 2 ..."],
  "hints": ["gentle nudge", "more specific hint", "almost there hint"]
}

The three hints must reveal progressively more, but none may state the final answer.
Make sure the problem is clear, age-appropriate, and has a single correct numeric answer."#
        .into(),
      feedback_template: r#"Generate personalized feedback for this math problem:

Problem: "{problem}"
Correct Answer: {correct_answer}
Student's Answer: {user_answer}
Is Correct: {is_correct}

Congratulate them if correct, or gently explain the mistake if wrong. Explain the solution in simple terms
and encourage them to keep practicing. Keep it concise (2-3 sentences)."#
        .into(),
      hint_template: r#"A student is working on this problem:

Problem: "{problem}"

They answered {user_answer}, which is not correct. Give ONE short hint (under 40 words) that points at
what might have gone wrong with their answer of {user_answer}. Do NOT reveal the final answer."#
        .into(),
    }
  }
}

/// Attempt to load `AppConfig` from MATH_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("MATH_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "mathpractice_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "mathpractice_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "mathpractice_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
