//! Session lifecycle manager.
//!
//! [`Monitor`] owns one browser session per key and keeps it alive: it runs the
//! dashboard setup flow, polls the remote-call tap into the [`SnapshotStore`],
//! rebuilds the session on a fixed refresh interval, retries failed setups on
//! a flat backoff, and tears everything down on shutdown.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use geowatch_protocol::Snapshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::activity::ActivityTracker;
use crate::browser::{Browser, Driver, Page};
use crate::config::MonitorConfig;
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::js;
use crate::registry::{Registry, SetupClaim};
use crate::session::Session;
use crate::store::SnapshotStore;
use crate::tap::RemoteCallTap;

/// Cheaply clonable handle to the session manager.
#[derive(Clone)]
pub struct Monitor {
	inner: Arc<Inner>,
}

struct Inner {
	config: MonitorConfig,
	driver: Arc<dyn Driver>,
	tap: RemoteCallTap,
	registry: Registry,
	store: SnapshotStore,
	activity: ActivityTracker,
}

impl Monitor {
	pub fn new(config: MonitorConfig, driver: Arc<dyn Driver>) -> Self {
		let tap = RemoteCallTap::for_dashboard(&config.dashboard);
		Self {
			inner: Arc::new(Inner {
				config,
				driver,
				tap,
				registry: Registry::new(),
				store: SnapshotStore::new(),
				activity: ActivityTracker::new(),
			}),
		}
	}

	pub fn config(&self) -> &MonitorConfig {
		&self.inner.config
	}

	pub fn store(&self) -> &SnapshotStore {
		&self.inner.store
	}

	pub fn activity(&self) -> &ActivityTracker {
		&self.inner.activity
	}

	/// Runs one setup attempt for `key` to completion.
	///
	/// Returns immediately when a setup for `key` is already in flight. A live
	/// session is not checked here; if one exists it is replaced.
	pub async fn setup(&self, key: &str) {
		let Some(claim) = self.inner.registry.claim(key) else {
			info!(target = "geowatch", key, "setup already in progress");
			return;
		};
		self.run_setup(claim).await;
	}

	/// Starts a setup in the background when nothing is tracked for `key`.
	///
	/// Returns `false` if `key` has a live session, an in-flight setup or a
	/// pending retry.
	pub fn start(&self, key: &str) -> bool {
		let Some(claim) = self.inner.registry.claim_idle(key) else {
			return false;
		};
		tokio::spawn(self.run_setup(claim));
		true
	}

	fn run_setup(&self, claim: SetupClaim) -> BoxFuture<'static, ()> {
		let monitor = self.clone();
		async move {
			if claim.is_cancelled() {
				return;
			}
			let key = claim.key().to_string();
			let started = Instant::now();
			info!(target = "geowatch", key = %key, "setting up session");

			match monitor.open_session(&key).await {
				Ok((browser, page)) => monitor.activate(&claim, browser, page, started).await,
				Err(err) => {
					let backoff = monitor.inner.config.retry_backoff;
					let scheduled = monitor
						.inner
						.registry
						.defer_retry(&claim, |generation| monitor.spawn_retry(key.clone(), generation));
					if scheduled {
						warn!(
							target = "geowatch",
							key = %key,
							error = %err,
							retry_in_s = backoff.as_secs(),
							"session setup failed"
						);
					} else {
						info!(target = "geowatch", key = %key, error = %err, "setup abandoned after shutdown");
					}
				}
			}
		}
		.boxed()
	}

	/// Launches a browser and drives the dashboard to the key's detail view.
	///
	/// The browser is closed again if any later step fails.
	async fn open_session(&self, key: &str) -> Result<(Box<dyn Browser>, Arc<dyn Page>)> {
		let step = Instant::now();
		let browser = self.inner.driver.launch(&self.inner.config.launch).await?;
		debug!(target = "geowatch", key, elapsed_ms = elapsed_ms(step), "browser launched");

		match self.prepare_page(browser.as_ref(), key).await {
			Ok(page) => Ok((browser, page)),
			Err(err) => {
				if let Err(close_err) = browser.close().await {
					debug!(target = "geowatch", key, error = %close_err, "closing failed browser");
				}
				Err(err)
			}
		}
	}

	async fn prepare_page(&self, browser: &dyn Browser, key: &str) -> Result<Arc<dyn Page>> {
		let dashboard = &self.inner.config.dashboard;
		let page = browser.new_page().await?;

		let step = Instant::now();
		page.goto(&dashboard.url, dashboard.navigation_timeout).await?;
		debug!(target = "geowatch", key, elapsed_ms = elapsed_ms(step), "dashboard loaded");

		let step = Instant::now();
		page.wait_for_function(&js::absent_or_hidden(&dashboard.loading_indicator), dashboard.wait_timeout)
			.await?;
		debug!(target = "geowatch", key, elapsed_ms = elapsed_ms(step), "loading overlay cleared");

		let step = Instant::now();
		page.type_text(&dashboard.search_input, key).await?;
		page.wait_for_selector(&dashboard.result_table, dashboard.wait_timeout).await?;
		debug!(target = "geowatch", key, elapsed_ms = elapsed_ms(step), "search results rendered");

		self.inner.tap.install(page.as_ref()).await?;

		let clicked = page.evaluate(&js::click_row_containing(&dashboard.result_row, key)).await?;
		if clicked.as_bool() != Some(true) {
			warn!(target = "geowatch", key, "no result row matches key");
		}
		Ok(page)
	}

	async fn activate(&self, claim: &SetupClaim, browser: Box<dyn Browser>, page: Arc<dyn Page>, started: Instant) {
		let key = claim.key().to_string();
		let id = self.inner.registry.next_session_id();
		let cancel = CancellationToken::new();
		let poll = tokio::spawn(
			self.clone()
				.poll_loop(key.clone(), id, Arc::clone(&page), cancel.clone()),
		);
		let refresh = tokio::spawn(self.clone().refresh_loop(key.clone(), cancel.clone()));
		let session = Session::new(id, key.clone(), browser, page, cancel, poll, refresh);

		match self.inner.registry.insert_claimed(claim, session) {
			Ok(displaced) => {
				if let Some(displaced) = displaced {
					debug!(target = "geowatch", key = %key, session = displaced.id, "replacing live session");
					displaced.close().await;
				}
				info!(target = "geowatch", key = %key, session = id, elapsed_ms = elapsed_ms(started), "listening");
			}
			Err(abandoned) => {
				info!(target = "geowatch", key = %key, "shutdown during setup, discarding session");
				abandoned.close().await;
			}
		}
	}

	fn spawn_retry(&self, key: String, generation: u64) -> JoinHandle<()> {
		let monitor = self.clone();
		let backoff = self.inner.config.retry_backoff;
		tokio::spawn(async move {
			tokio::time::sleep(backoff).await;
			match monitor.inner.registry.claim_retry(&key, generation) {
				Some(claim) => {
					info!(target = "geowatch", key = %key, "retrying setup");
					monitor.run_setup(claim).await;
				}
				None => debug!(target = "geowatch", key = %key, "retry superseded"),
			}
		})
	}

	/// Moves tapped telemetry into the store until cancelled or the page fails.
	async fn poll_loop(self, key: String, id: u64, page: Arc<dyn Page>, cancel: CancellationToken) {
		let period = self.inner.config.poll_interval;
		let read_timeout = self.inner.config.read_timeout;
		let fingerprint = Fingerprint::of(&key);
		let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
		ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = cancel.cancelled() => return,
				_ = ticks.tick() => {}
			}

			let read = match tokio::time::timeout(read_timeout, self.inner.tap.read(page.as_ref())).await {
				Ok(read) => read,
				Err(_) => Err(Error::timeout(read_timeout, "telemetry read")),
			};

			match read {
				Ok(Some(snapshot)) => {
					if cancel.is_cancelled() {
						return;
					}
					if self.inner.store.offer(&fingerprint, snapshot) {
						debug!(target = "geowatch", key = %key, "new telemetry");
					}
				}
				Ok(None) => trace!(target = "geowatch", key = %key, "no telemetry yet"),
				Err(err) if err.is_payload() => {
					warn!(target = "geowatch", key = %key, error = %err, "skipping undecodable telemetry");
				}
				Err(err) => {
					if cancel.is_cancelled() {
						return;
					}
					warn!(target = "geowatch", key = %key, error = %err, "telemetry read failed, restarting session");
					tokio::spawn(self.clone().recover(key, id));
					return;
				}
			}
		}
	}

	/// Replaces a failed session with a retry timer.
	async fn recover(self, key: String, id: u64) {
		let retired = self
			.inner
			.registry
			.retire(&key, id, |generation| self.spawn_retry(key.clone(), generation));
		match retired {
			Some(session) => session.close().await,
			None => debug!(target = "geowatch", key = %key, session = id, "session already replaced"),
		}
	}

	async fn refresh_loop(self, key: String, cancel: CancellationToken) {
		tokio::select! {
			_ = cancel.cancelled() => {}
			_ = tokio::time::sleep(self.inner.config.refresh_interval) => {
				tokio::spawn(async move { self.refresh(&key).await });
			}
		}
	}

	/// Tears down the live session for `key` and sets it up again.
	///
	/// Cached telemetry and activity are kept. No-op without a live session.
	pub async fn refresh(&self, key: &str) {
		let Some((session, claim)) = self.inner.registry.take_for_refresh(key) else {
			debug!(target = "geowatch", key, "no session to refresh");
			return;
		};
		info!(target = "geowatch", key, session = session.id, "refreshing session");
		session.close().await;
		match claim {
			Some(claim) => self.run_setup(claim).await,
			None => info!(target = "geowatch", key, "setup already in progress"),
		}
	}

	/// Stops everything tracked for `key` and drops its cached state.
	///
	/// Idempotent. Returns whether a session, setup or retry was tracked.
	pub async fn shutdown(&self, key: &str) -> bool {
		let (session, tracked) = self.inner.registry.cancel(key);
		if let Some(session) = session {
			session.close().await;
		}
		self.inner.store.remove(&Fingerprint::of(key));
		self.inner.activity.remove(key);
		if tracked {
			info!(target = "geowatch", key, "stopped listening");
		}
		tracked
	}

	/// Tears down every session and discards all in-memory state.
	pub async fn shutdown_all(&self) {
		let sessions = self.inner.registry.drain();
		let count = sessions.len();
		join_all(sessions.into_iter().map(Session::close)).await;
		self.inner.store.clear();
		self.inner.activity.clear();
		info!(target = "geowatch", sessions = count, "all sessions closed");
	}

	/// Shuts down every key idle for longer than the inactivity timeout at
	/// `now`. Returns the keys shut down.
	pub async fn reap_idle(&self, now: Instant) -> Vec<String> {
		let idle = self.inner.activity.idle_keys(now, self.inner.config.inactivity_timeout);
		for key in &idle {
			info!(target = "geowatch", key = %key, "inactive, shutting down");
			self.shutdown(key).await;
		}
		idle
	}

	/// Records client activity for `key`.
	pub fn touch(&self, key: &str) {
		self.inner.activity.touch(key);
	}

	/// Latest cached snapshot for `key`.
	pub fn snapshot(&self, key: &str) -> Option<Snapshot> {
		self.inner.store.get(&Fingerprint::of(key))
	}

	pub fn is_listening(&self, key: &str) -> bool {
		self.inner.registry.is_listening(key)
	}

	pub fn is_setting_up(&self, key: &str) -> bool {
		self.inner.registry.is_setting_up(key)
	}

	pub fn has_pending_retry(&self, key: &str) -> bool {
		self.inner.registry.has_pending_retry(key)
	}

	/// True when `key` has a live session, an in-flight setup or a pending retry.
	pub fn is_tracked(&self, key: &str) -> bool {
		self.inner.registry.is_tracked(key)
	}

	/// Keys with a live session, sorted.
	pub fn active_keys(&self) -> Vec<String> {
		self.inner.registry.keys()
	}

	pub fn session_count(&self) -> usize {
		self.inner.registry.len()
	}
}

fn elapsed_ms(since: Instant) -> u64 {
	since.elapsed().as_millis() as u64
}
