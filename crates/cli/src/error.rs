use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Request failures, rendered as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
	/// Missing or empty `key` parameter.
	#[error("{0}")]
	MissingKey(&'static str),

	/// The key already has a session, setup or pending retry.
	#[error("Browser already listening or setup in progress for this key")]
	AlreadyListening,

	#[error("{0}")]
	NotFound(String),
}

impl ApiError {
	pub fn status(&self) -> StatusCode {
		match self {
			ApiError::MissingKey(_) | ApiError::AlreadyListening => StatusCode::BAD_REQUEST,
			ApiError::NotFound(_) => StatusCode::NOT_FOUND,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status(), Json(json!({ "error": self.to_string() }))).into_response()
	}
}
