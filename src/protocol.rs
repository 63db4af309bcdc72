//! Public protocol structs for the `/api/math-problem` endpoint (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Achievement, AchievementId, Difficulty, HistoryEntry, Operation, ProblemSession, ProblemSource, UserStats,
};
use crate::session::HintSource;

/// Every request carries an `action` tag; `userId` is optional on all of them.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ActionRequest {
    Generate {
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
        #[serde(default)]
        difficulty: Difficulty,
        #[serde(rename = "problemType", default)]
        problem_type: Operation,
    },
    Submit {
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "userAnswer")]
        user_answer: f64,
        #[serde(rename = "hintsUsed", default)]
        hints_used: u32,
    },
    GetHistory {
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
    },
    GetHint {
        #[serde(rename = "userId", default)]
        user_id: Option<String>,
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// Wipes stats, achievements and history for the user.
    ResetProgress {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

impl ActionRequest {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            ActionRequest::Generate { user_id, .. }
            | ActionRequest::Submit { user_id, .. }
            | ActionRequest::GetHistory { user_id }
            | ActionRequest::GetHint { user_id, .. } => user_id.as_deref().filter(|s| !s.trim().is_empty()),
            ActionRequest::ResetProgress { user_id } => Some(user_id.as_str()).filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Problem as the UI sees it (the answer is included so the solution view can render).
#[derive(Debug, Serialize)]
pub struct ProblemOut {
    pub problem_text: String,
    pub final_answer: f64,
    pub difficulty: Difficulty,
    pub problem_type: Operation,
    pub steps: Vec<String>,
    pub hints: Vec<String>,
}

pub fn to_out(s: &ProblemSession) -> ProblemOut {
    ProblemOut {
        problem_text: s.problem.problem_text.clone(),
        final_answer: s.problem.correct_answer,
        difficulty: s.problem.difficulty,
        problem_type: s.problem.operation,
        steps: s.problem.steps.clone(),
        hints: s.problem.hints.clone(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOut {
    pub success: bool,
    pub user_id: String,
    pub session_id: String,
    pub source: ProblemSource,
    pub problem: ProblemOut,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOut {
    pub success: bool,
    pub user_id: String,
    pub is_correct: bool,
    pub feedback: String,
    pub score: UserStats,
    pub achievements: Vec<Achievement>,
    pub new_achievements: Vec<AchievementId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOut {
    pub success: bool,
    pub user_id: String,
    pub score: UserStats,
    pub history: Vec<HistoryEntry>,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintOut {
    pub success: bool,
    pub user_id: String,
    pub hint: String,
    pub hint_index: usize,
    pub total_hints: usize,
    pub source: HintSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOut {
    pub success: bool,
    pub user_id: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_action() {
        let g: ActionRequest =
            serde_json::from_str(r#"{"action": "generate", "difficulty": "hard", "problemType": "division"}"#).unwrap();
        assert!(matches!(
            g,
            ActionRequest::Generate { difficulty: Difficulty::Hard, problem_type: Operation::Division, .. }
        ));

        let s: ActionRequest = serde_json::from_str(
            r#"{"action": "submit", "sessionId": "abc", "userAnswer": 28, "hintsUsed": 2, "userId": "user_1"}"#,
        )
        .unwrap();
        assert_eq!(s.user_id(), Some("user_1"));
        assert!(matches!(s, ActionRequest::Submit { user_answer, hints_used: 2, .. } if user_answer == 28.0));

        let h: ActionRequest = serde_json::from_str(r#"{"action": "getHistory"}"#).unwrap();
        assert!(h.user_id().is_none());

        let hint: ActionRequest = serde_json::from_str(r#"{"action": "getHint", "sessionId": "abc"}"#).unwrap();
        assert!(matches!(hint, ActionRequest::GetHint { .. }));

        let reset: ActionRequest = serde_json::from_str(r#"{"action": "resetProgress", "userId": "user_9"}"#).unwrap();
        assert_eq!(reset.user_id(), Some("user_9"));
    }

    #[test]
    fn generate_defaults_to_easy_mixed() {
        let g: ActionRequest = serde_json::from_str(r#"{"action": "generate"}"#).unwrap();
        assert!(matches!(
            g,
            ActionRequest::Generate { difficulty: Difficulty::Easy, problem_type: Operation::Mixed, .. }
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(serde_json::from_str::<ActionRequest>(r#"{"action": "delete"}"#).is_err());
        assert!(serde_json::from_str::<ActionRequest>(r#"{"action": "submit", "sessionId": "x"}"#).is_err());
    }
}
