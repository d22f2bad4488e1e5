//! Browser automation seam.
//!
//! The session manager only talks to these traits, so the dashboard flow can
//! run against Chromium in production and against scripted doubles in tests.
//!
//! - [`Driver`]: launches browser processes
//! - [`Browser`]: opens pages, closes the process
//! - [`Page`]: navigation, waits, typing and script evaluation

mod chromium;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
pub use chromium::ChromiumDriver;
use serde_json::Value;
use tokio::time::Instant;

use crate::config::LaunchConfig;
use crate::error::{Error, Result};
use crate::js;

/// Interval between predicate checks in the default wait implementations.
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches browser processes.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
	async fn launch(&self, options: &LaunchConfig) -> Result<Box<dyn Browser>>;
}

/// A running browser process.
#[async_trait]
pub trait Browser: Send + Sync {
	/// Opens a blank page.
	async fn new_page(&self) -> Result<Arc<dyn Page>>;

	/// Closes every page and terminates the browser process.
	async fn close(&self) -> Result<()>;
}

/// One automated tab.
#[async_trait]
pub trait Page: Send + Sync {
	/// Navigates to `url`, failing with [`Error::Timeout`] after `timeout`.
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

	/// Focuses the element matching `selector` and types `text` into it.
	async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

	/// Evaluates a JavaScript expression and returns its (primitive) result.
	async fn evaluate(&self, expression: &str) -> Result<Value>;

	/// Polls `predicate` until it evaluates to `true`.
	async fn wait_for_function(&self, predicate: &str, timeout: Duration) -> Result<()> {
		let deadline = Instant::now() + timeout;
		loop {
			if self.evaluate(predicate).await?.as_bool() == Some(true) {
				return Ok(());
			}
			if Instant::now() >= deadline {
				return Err(Error::timeout(timeout, predicate));
			}
			tokio::time::sleep(WAIT_POLL_INTERVAL).await;
		}
	}

	/// Waits until an element matching `selector` is attached.
	async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
		self.wait_for_function(&js::element_present(selector), timeout)
			.await
			.map_err(|err| match err {
				Error::Timeout { ms, .. } => Error::Timeout {
					ms,
					condition: selector.to_string(),
				},
				other => other,
			})
	}
}
