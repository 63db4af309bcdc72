//! Error type shared by services and HTTP handlers.
//!
//! Handlers return `Result<_, AppError>`; the `IntoResponse` impl turns each variant
//! into a `{ "success": false, "error": ... }` envelope with a retry-style message.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("problem session not found: {0}")]
  NotFound(String),

  #[error("problem {0} is already solved")]
  AlreadySolved(String),

  #[error("no hints left for problem {0}")]
  HintsExhausted(String),

  #[error("invalid request: {0}")]
  BadRequest(String),

  #[error("text generation failed: {0}")]
  Generation(String),

  #[error("storage failure: {0}")]
  Storage(String),
}

impl From<reqwest::Error> for AppError {
  fn from(e: reqwest::Error) -> Self {
    AppError::Generation(e.to_string())
  }
}

impl From<std::io::Error> for AppError {
  fn from(e: std::io::Error) -> Self {
    AppError::Storage(e.to_string())
  }
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::AlreadySolved(_) | AppError::HintsExhausted(_) => StatusCode::CONFLICT,
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::Generation(_) => StatusCode::BAD_GATEWAY,
      AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Message safe to show to the student.
  pub fn user_message(&self) -> String {
    match self {
      AppError::NotFound(_) => "Problem session not found. Please generate a new problem and try again.".into(),
      AppError::AlreadySolved(_) => "You already solved this problem. Try a new one!".into(),
      AppError::HintsExhausted(_) => "No more hints for this problem.".into(),
      AppError::BadRequest(msg) => msg.clone(),
      AppError::Generation(_) | AppError::Storage(_) => "Something went wrong. Please try again.".into(),
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "mathpractice_backend", error = %self, %status, "Request failed");
    }
    let body = serde_json::json!({ "success": false, "error": self.user_message() });
    (status, Json(body)).into_response()
  }
}
