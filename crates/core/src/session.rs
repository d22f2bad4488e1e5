use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::browser::{Browser, Page};

/// One live browser dedicated to one key, plus the tasks that service it.
pub(crate) struct Session {
	pub(crate) id: u64,
	pub(crate) key: String,
	browser: Box<dyn Browser>,
	#[allow(dead_code, reason = "keeps the tab alive independently of the poll task")]
	page: Arc<dyn Page>,
	cancel: CancellationToken,
	poll: JoinHandle<()>,
	refresh: JoinHandle<()>,
	started_at: Instant,
}

impl Session {
	pub(crate) fn new(
		id: u64,
		key: String,
		browser: Box<dyn Browser>,
		page: Arc<dyn Page>,
		cancel: CancellationToken,
		poll: JoinHandle<()>,
		refresh: JoinHandle<()>,
	) -> Self {
		Self {
			id,
			key,
			browser,
			page,
			cancel,
			poll,
			refresh,
			started_at: Instant::now(),
		}
	}

	/// Cancels the session token, stops both tasks, then closes the browser.
	///
	/// Browser close failures are logged; the process may already be gone.
	pub(crate) async fn close(self) {
		self.cancel.cancel();
		self.poll.abort();
		self.refresh.abort();
		if let Err(err) = self.browser.close().await {
			warn!(target = "geowatch", key = %self.key, error = %err, "browser close failed");
		}
		debug!(
			target = "geowatch",
			key = %self.key,
			session = self.id,
			uptime_ms = self.started_at.elapsed().as_millis() as u64,
			"session closed"
		);
	}
}
