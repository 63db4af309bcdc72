//! Problem sessions: generation, answer checking and hints.
//!
//! Per problem the lifecycle is `Generated -> Hinted* -> Incorrect* -> Correct`.
//! The phase is derived from the stored hint cursor and submissions; `Correct` is terminal.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{FeedbackCfg, Prompts};
use crate::domain::{Difficulty, Operation, Problem, ProblemSession, Submission};
use crate::error::AppError;
use crate::generator::{build_problem_prompt, parse_problem, TextGenerator};
use crate::seeds::{canned_feedback, fallback_problem};
use crate::store::ProblemRepository;
use crate::util::{fill_template, format_number};

#[derive(Clone, Debug, PartialEq)]
pub enum SessionPhase {
  Generated,
  Hinted,
  Incorrect { last_answer: f64 },
  Correct,
}

/// `submissions` must be newest first.
pub fn phase_of(session: &ProblemSession, submissions: &[Submission]) -> SessionPhase {
  if submissions.iter().any(|s| s.is_correct) {
    return SessionPhase::Correct;
  }
  match submissions.first() {
    Some(last) => SessionPhase::Incorrect { last_answer: last.user_answer },
    None if session.hints_used() > 0 => SessionPhase::Hinted,
    None => SessionPhase::Generated,
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HintSource {
  Pregenerated,
  Ai,
}

#[derive(Clone, Debug)]
pub struct HintOutcome {
  pub text: String,
  /// How many pre-generated hints have been revealed (AI hints do not move it).
  pub index: usize,
  pub total: usize,
  pub source: HintSource,
}

#[derive(Clone, Debug)]
pub struct SubmitOutcome {
  pub submission: Submission,
  pub problem: Problem,
}

#[derive(Clone)]
pub struct ProblemSessionService {
  repo: Arc<dyn ProblemRepository>,
  generator: Option<Arc<dyn TextGenerator>>,
  prompts: Prompts,
  feedback: FeedbackCfg,
}

impl ProblemSessionService {
  pub fn new(
    repo: Arc<dyn ProblemRepository>,
    generator: Option<Arc<dyn TextGenerator>>,
    prompts: Prompts,
    feedback: FeedbackCfg,
  ) -> Self {
    Self { repo, generator, prompts, feedback }
  }

  /// Generates and stores a problem. Model failures and malformed replies become the fallback problem.
  #[instrument(level = "info", skip(self), fields(difficulty = difficulty.as_str(), operation = operation.as_str()))]
  pub async fn generate(&self, difficulty: Difficulty, operation: Operation) -> Result<ProblemSession, AppError> {
    let problem = match &self.generator {
      Some(gen) => {
        let prompt = build_problem_prompt(&self.prompts, difficulty, operation);
        match gen.generate_text(&prompt).await {
          Ok(text) => parse_problem(&text, difficulty, operation),
          Err(e) => {
            error!(target: "problem", error = %e, "Problem generation failed; using fallback problem");
            fallback_problem()
          }
        }
      }
      None => {
        warn!(target: "problem", "No text generator configured; using fallback problem");
        fallback_problem()
      }
    };

    let session = ProblemSession {
      id: Uuid::new_v4().to_string(),
      problem,
      hints_revealed: 0,
      ai_hints: 0,
      created_at: Utc::now(),
    };
    self.repo.insert_session(session.clone()).await?;
    info!(target: "problem", id = %session.id, source = ?session.problem.source, "Problem session created");
    Ok(session)
  }

  async fn load(&self, problem_id: &str) -> Result<(ProblemSession, Vec<Submission>), AppError> {
    let session = self
      .repo
      .get_session(problem_id)
      .await?
      .ok_or_else(|| AppError::NotFound(problem_id.to_string()))?;
    let submissions = self.repo.submissions_for(problem_id).await?;
    Ok((session, submissions))
  }

  /// Exact numeric comparison, then feedback, then the submission is persisted.
  #[instrument(level = "info", skip(self), fields(%problem_id))]
  pub async fn submit_answer(&self, problem_id: &str, user_answer: f64, hints_used: u32) -> Result<SubmitOutcome, AppError> {
    let (session, submissions) = self.load(problem_id).await?;
    if phase_of(&session, &submissions) == SessionPhase::Correct {
      return Err(AppError::AlreadySolved(problem_id.to_string()));
    }

    let revealed = session.hints_used() as u32;
    let problem = session.problem;
    let is_correct = user_answer == problem.correct_answer;
    let feedback_text = self.feedback_for(&problem, user_answer, is_correct).await;

    let submission = Submission {
      id: Uuid::new_v4().to_string(),
      problem_id: problem_id.to_string(),
      user_answer,
      is_correct,
      hints_used: hints_used.max(revealed),
      feedback_text,
      difficulty: problem.difficulty,
      operation: problem.operation,
      created_at: Utc::now(),
    };
    self.repo.insert_submission(submission.clone()).await?;
    info!(target: "problem", id = %problem_id, %is_correct, hints_used = submission.hints_used, "Answer evaluated");
    Ok(SubmitOutcome { submission, problem })
  }

  /// Undoes `submit_answer` when the follow-up progress write fails, so the answer can be resent.
  pub async fn retract(&self, submission: &Submission) {
    match self.repo.remove_submission(&submission.problem_id, &submission.id).await {
      Ok(()) => warn!(target: "problem", id = %submission.problem_id, submission = %submission.id, "Submission retracted"),
      Err(e) => error!(target: "problem", id = %submission.problem_id, error = %e, "Failed to retract submission"),
    }
  }

  async fn feedback_for(&self, problem: &Problem, user_answer: f64, is_correct: bool) -> String {
    let canned = || canned_feedback(is_correct, user_answer, problem.correct_answer);
    if !self.feedback.ai_feedback {
      return canned();
    }
    let Some(gen) = &self.generator else { return canned() };

    let prompt = fill_template(
      &self.prompts.feedback_template,
      &[
        ("problem", &problem.problem_text),
        ("correct_answer", &format_number(problem.correct_answer)),
        ("user_answer", &format_number(user_answer)),
        ("is_correct", if is_correct { "true" } else { "false" }),
      ],
    );
    match gen.generate_text(&prompt).await {
      Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
      Ok(_) => canned(),
      Err(e) => {
        error!(target: "problem", error = %e, "AI feedback failed; using canned feedback");
        canned()
      }
    }
  }

  /// Next hint. After a wrong answer the model is asked for a hint about that answer;
  /// otherwise (or if that fails) the next pre-generated hint is revealed.
  #[instrument(level = "info", skip(self), fields(%problem_id))]
  pub async fn hint(&self, problem_id: &str) -> Result<HintOutcome, AppError> {
    let (mut session, submissions) = self.load(problem_id).await?;
    let total = session.problem.hints.len();

    match phase_of(&session, &submissions) {
      SessionPhase::Correct => return Err(AppError::AlreadySolved(problem_id.to_string())),
      SessionPhase::Incorrect { last_answer } => {
        if let Some(text) = self.contextual_hint(&session.problem, last_answer).await {
          session.ai_hints += 1;
          let index = session.hints_revealed;
          self.repo.save_session(session).await?;
          return Ok(HintOutcome { text, index, total, source: HintSource::Ai });
        }
      }
      SessionPhase::Generated | SessionPhase::Hinted => {}
    }

    let text = session
      .problem
      .hints
      .get(session.hints_revealed)
      .cloned()
      .ok_or_else(|| AppError::HintsExhausted(problem_id.to_string()))?;
    session.hints_revealed += 1;
    let index = session.hints_revealed;
    self.repo.save_session(session).await?;
    Ok(HintOutcome { text, index, total, source: HintSource::Pregenerated })
  }

  async fn contextual_hint(&self, problem: &Problem, last_answer: f64) -> Option<String> {
    let gen = self.generator.as_ref()?;
    let prompt = fill_template(
      &self.prompts.hint_template,
      &[("problem", &problem.problem_text), ("user_answer", &format_number(last_answer))],
    );
    match gen.generate_text(&prompt).await {
      Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
      Ok(_) => None,
      Err(e) => {
        error!(target: "problem", error = %e, "Contextual hint failed; using pre-generated hint");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ProblemSource;
  use crate::store::MemoryRepository;
  use async_trait::async_trait;
  use std::collections::VecDeque;
  use std::sync::Mutex;

  /// Replays scripted replies in order and records every prompt it receives.
  #[derive(Default)]
  struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
  }

  impl ScriptedGenerator {
    fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
      let replies = replies
        .into_iter()
        .map(|r| r.map(str::to_string).map_err(str::to_string))
        .collect();
      Arc::new(Self { replies: Mutex::new(replies), prompts: Mutex::default() })
    }

    fn prompts(&self) -> Vec<String> {
      self.prompts.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl TextGenerator for ScriptedGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String, AppError> {
      self.prompts.lock().unwrap().push(prompt.to_string());
      match self.replies.lock().unwrap().pop_front() {
        Some(Ok(text)) => Ok(text),
        Some(Err(e)) => Err(AppError::Generation(e)),
        None => Err(AppError::Generation("script exhausted".into())),
      }
    }
  }

  const STICKERS: &str = r#"{"problem_text": "Sarah has 24 stickers. She gives 8 away and buys 12 more. How many now?",
    "final_answer": 28, "steps": ["24 - 8 = 16", "16 + 12 = 28"],
    "hints": ["Start with 24.", "Take away the 8 first.", "Now add the 12."]}"#;

  fn service(gen: Option<Arc<ScriptedGenerator>>, ai_feedback: bool) -> ProblemSessionService {
    ProblemSessionService::new(
      Arc::new(MemoryRepository::new()),
      gen.map(|g| g as Arc<dyn TextGenerator>),
      Prompts::default(),
      FeedbackCfg { ai_feedback },
    )
  }

  #[tokio::test]
  async fn exact_answer_is_correct_and_epsilon_is_not() {
    let gen = ScriptedGenerator::new(vec![Ok(STICKERS), Ok(STICKERS)]);
    let svc = service(Some(gen), false);

    let a = svc.generate(Difficulty::Medium, Operation::Mixed).await.unwrap();
    assert_eq!(a.problem.correct_answer, 28.0);
    let off = svc.submit_answer(&a.id, 28.0000001, 0).await.unwrap();
    assert!(!off.submission.is_correct);

    let b = svc.generate(Difficulty::Medium, Operation::Mixed).await.unwrap();
    let exact = svc.submit_answer(&b.id, 28.0, 0).await.unwrap();
    assert!(exact.submission.is_correct);
    assert!(exact.submission.feedback_text.contains("28"));
  }

  #[tokio::test]
  async fn malformed_or_failed_generation_uses_fallback() {
    let gen = ScriptedGenerator::new(vec![Ok("{\"problem_text\": \"trunc"), Err("connection refused")]);
    let svc = service(Some(gen.clone()), false);
    for _ in 0..2 {
      let s = svc.generate(Difficulty::Easy, Operation::Addition).await.unwrap();
      assert_eq!(s.problem.correct_answer, 18.0);
      assert_eq!(s.problem.source, ProblemSource::Fallback);
    }
    assert!(gen.prompts()[0].contains("1 and 20"));

    let offline = service(None, false);
    let s = offline.generate(Difficulty::Hard, Operation::Division).await.unwrap();
    assert_eq!(s.problem.correct_answer, 18.0);
  }

  #[tokio::test]
  async fn unknown_problem_is_not_found() {
    let svc = service(None, false);
    assert!(matches!(svc.submit_answer("missing", 1.0, 0).await, Err(AppError::NotFound(_))));
    assert!(matches!(svc.hint("missing").await, Err(AppError::NotFound(_))));
  }

  #[tokio::test]
  async fn correct_answer_is_terminal() {
    let svc = service(None, false);
    let s = svc.generate(Difficulty::Easy, Operation::Mixed).await.unwrap();
    let wrong = svc.submit_answer(&s.id, 17.0, 0).await.unwrap();
    assert!(!wrong.submission.is_correct);
    assert!(svc.submit_answer(&s.id, 18.0, 0).await.unwrap().submission.is_correct);
    assert!(matches!(svc.submit_answer(&s.id, 18.0, 0).await, Err(AppError::AlreadySolved(_))));
    assert!(matches!(svc.hint(&s.id).await, Err(AppError::AlreadySolved(_))));
  }

  #[tokio::test]
  async fn pregenerated_hints_run_out_after_three() {
    let svc = service(None, false);
    let s = svc.generate(Difficulty::Easy, Operation::Mixed).await.unwrap();
    for n in 1..=3 {
      let h = svc.hint(&s.id).await.unwrap();
      assert_eq!(h.index, n);
      assert_eq!(h.total, 3);
      assert_eq!(h.source, HintSource::Pregenerated);
      assert_eq!(h.text, s.problem.hints[n - 1]);
    }
    assert!(matches!(svc.hint(&s.id).await, Err(AppError::HintsExhausted(_))));

    // revealed hints count even if the client under-reports
    let sub = svc.submit_answer(&s.id, 18.0, 1).await.unwrap();
    assert_eq!(sub.submission.hints_used, 3);
  }

  #[tokio::test]
  async fn hint_after_wrong_answer_references_it() {
    let gen = ScriptedGenerator::new(vec![
      Err("offline"),
      Ok("Check the subtraction again: did you take away 13 instead of 12?"),
    ]);
    let svc = service(Some(gen.clone()), false);
    let s = svc.generate(Difficulty::Easy, Operation::Subtraction).await.unwrap();
    svc.submit_answer(&s.id, 17.0, 0).await.unwrap();

    let h = svc.hint(&s.id).await.unwrap();
    assert_eq!(h.source, HintSource::Ai);
    assert_eq!(h.index, 0);
    let hint_prompt = gen.prompts().last().cloned().unwrap();
    assert!(hint_prompt.contains("17"));
    assert!(hint_prompt.contains("Do NOT reveal the final answer"));

    // script exhausted: degrade to the pre-generated list
    let h2 = svc.hint(&s.id).await.unwrap();
    assert_eq!(h2.source, HintSource::Pregenerated);
    assert_eq!(h2.text, s.problem.hints[0]);
  }

  #[tokio::test]
  async fn ai_feedback_degrades_to_canned() {
    let gen = ScriptedGenerator::new(vec![Ok(STICKERS), Ok("Nice work, Sarah would be proud!"), Ok(STICKERS), Err("timeout")]);
    let svc = service(Some(gen), true);

    let a = svc.generate(Difficulty::Medium, Operation::Mixed).await.unwrap();
    let ok = svc.submit_answer(&a.id, 28.0, 0).await.unwrap();
    assert_eq!(ok.submission.feedback_text, "Nice work, Sarah would be proud!");

    let b = svc.generate(Difficulty::Medium, Operation::Mixed).await.unwrap();
    let wrong = svc.submit_answer(&b.id, 30.0, 0).await.unwrap();
    assert!(wrong.submission.feedback_text.contains("the correct answer is 28"));
  }

  #[test]
  fn phase_follows_hints_and_submissions() {
    let mut session = ProblemSession {
      id: "p".into(),
      problem: fallback_problem(),
      hints_revealed: 0,
      ai_hints: 0,
      created_at: Utc::now(),
    };
    assert_eq!(phase_of(&session, &[]), SessionPhase::Generated);
    session.hints_revealed = 1;
    assert_eq!(phase_of(&session, &[]), SessionPhase::Hinted);

    let sub = |answer: f64, is_correct: bool| Submission {
      id: answer.to_string(),
      problem_id: "p".into(),
      user_answer: answer,
      is_correct,
      hints_used: 0,
      feedback_text: String::new(),
      difficulty: Difficulty::Easy,
      operation: Operation::Subtraction,
      created_at: Utc::now(),
    };
    let newest_first = [sub(16.0, false), sub(17.0, false)];
    assert_eq!(phase_of(&session, &newest_first), SessionPhase::Incorrect { last_answer: 16.0 });
    assert_eq!(phase_of(&session, &[sub(18.0, true), sub(17.0, false)]), SessionPhase::Correct);
  }
}
