use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while driving a dashboard session.
///
/// None of these reach HTTP callers: the session manager logs them and
/// schedules a retry.
#[derive(Debug, Error)]
pub enum Error {
	#[error("browser launch failed: {0}")]
	BrowserLaunch(String),

	#[error("navigation to {url} failed: {reason}")]
	Navigation { url: String, reason: String },

	#[error("timeout after {ms}ms waiting for: {condition}")]
	Timeout { ms: u64, condition: String },

	#[error("element not found: {selector}")]
	ElementNotFound { selector: String },

	#[error("javascript evaluation failed: {0}")]
	JsEval(String),

	#[error("remote-call tap unavailable: {0}")]
	Bridge(String),

	#[error("malformed telemetry payload")]
	Payload(#[from] serde_json::Error),

	#[error("browser protocol error: {0}")]
	Protocol(String),
}

impl Error {
	pub(crate) fn timeout(limit: Duration, condition: impl Into<String>) -> Self {
		Error::Timeout {
			ms: limit.as_millis() as u64,
			condition: condition.into(),
		}
	}

	/// Returns true when the page answered but the telemetry could not be decoded.
	///
	/// Such errors leave the browser usable, so the poll loop skips the tick
	/// instead of restarting the session.
	pub fn is_payload(&self) -> bool {
		matches!(self, Error::Payload(_))
	}
}
