//! Built-in content used when the text generator is missing or returns something unusable.

use crate::domain::{Difficulty, Operation, Problem, ProblemSource};
use crate::util::format_number;

/// The fixed fallback problem. Always the same, so tests and offline runs are deterministic.
pub fn fallback_problem() -> Problem {
  Problem {
    problem_text: "A teacher has 30 pencils. She gives 12 pencils to her students. How many pencils does she have left?".into(),
    correct_answer: 18.0,
    difficulty: Difficulty::Easy,
    operation: Operation::Subtraction,
    steps: vec![
      "Start with the number of pencils the teacher has: 30.".into(),
      "She gives away 12 pencils, so subtract: 30 - 12.".into(),
      "30 - 12 = 18, so she has 18 pencils left.".into(),
    ],
    hints: vec![
      "Think about whether the teacher ends up with more or fewer pencils.".into(),
      "Giving pencils away means you need to subtract.".into(),
      "Work out 30 - 12. Try taking away 10 first, then 2 more.".into(),
    ],
    source: ProblemSource::Fallback,
  }
}

/// Canned feedback used whenever model feedback is disabled or fails.
pub fn canned_feedback(is_correct: bool, user_answer: f64, correct_answer: f64) -> String {
  let user = format_number(user_answer);
  let correct = format_number(correct_answer);
  if is_correct {
    format!("Great job! {user} is exactly right. Keep up the excellent work!")
  } else {
    format!(
      "Not quite. You answered {user}, but the correct answer is {correct}. \
       Look at the solution steps and try another problem. You've got this!"
    )
  }
}
