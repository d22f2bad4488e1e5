//! Per-key bookkeeping for live sessions, in-flight setups and pending retries.
//!
//! Every check-then-act sequence the manager needs (claim a setup, register its
//! result, swap a failed session for a retry timer) runs under one lock
//! acquisition. The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::session::Session;

#[derive(Default)]
struct State {
	sessions: HashMap<String, Session>,
	setups: HashMap<String, SetupMarker>,
	retries: HashMap<String, PendingRetry>,
}

struct SetupMarker {
	claim: u64,
	cancel: CancellationToken,
}

struct PendingRetry {
	generation: u64,
	timer: JoinHandle<()>,
}

#[derive(Default)]
pub(crate) struct Registry {
	state: Arc<Mutex<State>>,
	next_session: AtomicU64,
	next_claim: AtomicU64,
}

/// Exclusive right to run one setup attempt for a key.
///
/// Dropping the claim releases the setup-in-progress marker.
pub(crate) struct SetupClaim {
	key: String,
	id: u64,
	cancel: CancellationToken,
	state: Arc<Mutex<State>>,
}

impl SetupClaim {
	pub(crate) fn key(&self) -> &str {
		&self.key
	}

	/// True once `shutdown` abandoned this setup.
	pub(crate) fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}
}

impl Drop for SetupClaim {
	fn drop(&mut self) {
		let mut state = self.state.lock();
		if state.setups.get(&self.key).is_some_and(|marker| marker.claim == self.id) {
			state.setups.remove(&self.key);
		}
	}
}

impl Registry {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn next_session_id(&self) -> u64 {
		self.next_session.fetch_add(1, Ordering::Relaxed) + 1
	}

	fn mark(&self, state: &mut State, key: &str) -> SetupClaim {
		let id = self.next_claim.fetch_add(1, Ordering::Relaxed) + 1;
		let cancel = CancellationToken::new();
		state.setups.insert(
			key.to_string(),
			SetupMarker {
				claim: id,
				cancel: cancel.clone(),
			},
		);
		SetupClaim {
			key: key.to_string(),
			id,
			cancel,
			state: Arc::clone(&self.state),
		}
	}

	/// Claims the setup marker unless a setup for `key` is already running.
	pub(crate) fn claim(&self, key: &str) -> Option<SetupClaim> {
		let mut state = self.state.lock();
		if state.setups.contains_key(key) {
			return None;
		}
		Some(self.mark(&mut state, key))
	}

	/// Claims the setup marker only when nothing at all is tracked for `key`.
	pub(crate) fn claim_idle(&self, key: &str) -> Option<SetupClaim> {
		let mut state = self.state.lock();
		if state.sessions.contains_key(key) || state.setups.contains_key(key) || state.retries.contains_key(key) {
			return None;
		}
		Some(self.mark(&mut state, key))
	}

	/// Consumes the retry timer `generation` and claims a setup in its place.
	///
	/// Returns `None` when the timer was cancelled or superseded, or when a
	/// session or setup for `key` appeared in the meantime.
	pub(crate) fn claim_retry(&self, key: &str, generation: u64) -> Option<SetupClaim> {
		let mut state = self.state.lock();
		if state.retries.get(key).is_none_or(|retry| retry.generation != generation) {
			return None;
		}
		state.retries.remove(key);
		if state.sessions.contains_key(key) || state.setups.contains_key(key) {
			return None;
		}
		Some(self.mark(&mut state, key))
	}

	/// Registers the session produced by `claim`.
	///
	/// Returns the displaced session, if any. Hands the session back as `Err`
	/// when the claim was cancelled while the setup ran.
	pub(crate) fn insert_claimed(&self, claim: &SetupClaim, session: Session) -> Result<Option<Session>, Session> {
		let mut state = self.state.lock();
		if claim.is_cancelled() {
			return Err(session);
		}
		Ok(state.sessions.insert(claim.key.clone(), session))
	}

	/// Schedules a retry for a failed setup unless the claim was cancelled.
	///
	/// `spawn` receives the timer generation and is called under the lock.
	pub(crate) fn defer_retry(&self, claim: &SetupClaim, spawn: impl FnOnce(u64) -> JoinHandle<()>) -> bool {
		let mut state = self.state.lock();
		if claim.is_cancelled() {
			return false;
		}
		self.replace_retry(&mut state, &claim.key, spawn);
		true
	}

	/// Removes session `id` for `key` and schedules a retry in the same step.
	///
	/// Returns `None`, scheduling nothing, when `id` is no longer the registered session.
	pub(crate) fn retire(&self, key: &str, id: u64, spawn: impl FnOnce(u64) -> JoinHandle<()>) -> Option<Session> {
		let mut state = self.state.lock();
		if state.sessions.get(key).is_none_or(|session| session.id != id) {
			return None;
		}
		let session = state.sessions.remove(key);
		self.replace_retry(&mut state, key, spawn);
		session
	}

	fn replace_retry(&self, state: &mut State, key: &str, spawn: impl FnOnce(u64) -> JoinHandle<()>) {
		let generation = self.next_claim.fetch_add(1, Ordering::Relaxed) + 1;
		let timer = spawn(generation);
		if let Some(previous) = state.retries.insert(key.to_string(), PendingRetry { generation, timer }) {
			previous.timer.abort();
		}
	}

	/// Removes the session for `key` and claims the setup that replaces it.
	///
	/// The claim is `None` when another setup is already running.
	pub(crate) fn take_for_refresh(&self, key: &str) -> Option<(Session, Option<SetupClaim>)> {
		let mut state = self.state.lock();
		let session = state.sessions.remove(key)?;
		let claim = if state.setups.contains_key(key) {
			None
		} else {
			Some(self.mark(&mut state, key))
		};
		Some((session, claim))
	}

	/// Forgets everything tracked for `key`.
	///
	/// Aborts the pending retry and cancels an in-flight setup; the setup's
	/// marker stays until its claim is dropped. Returns the removed session and
	/// whether anything was tracked.
	pub(crate) fn cancel(&self, key: &str) -> (Option<Session>, bool) {
		let mut state = self.state.lock();
		let session = state.sessions.remove(key);
		let retry = state.retries.remove(key);
		if let Some(retry) = &retry {
			retry.timer.abort();
		}
		let setup = state.setups.get(key);
		if let Some(marker) = setup {
			marker.cancel.cancel();
		}
		let tracked = session.is_some() || retry.is_some() || setup.is_some();
		(session, tracked)
	}

	/// Cancels every setup and retry and returns all sessions.
	pub(crate) fn drain(&self) -> Vec<Session> {
		let mut state = self.state.lock();
		for marker in state.setups.values() {
			marker.cancel.cancel();
		}
		for (_, retry) in state.retries.drain() {
			retry.timer.abort();
		}
		state.sessions.drain().map(|(_, session)| session).collect()
	}

	pub(crate) fn is_listening(&self, key: &str) -> bool {
		self.state.lock().sessions.contains_key(key)
	}

	pub(crate) fn is_setting_up(&self, key: &str) -> bool {
		self.state.lock().setups.contains_key(key)
	}

	pub(crate) fn has_pending_retry(&self, key: &str) -> bool {
		self.state.lock().retries.contains_key(key)
	}

	pub(crate) fn is_tracked(&self, key: &str) -> bool {
		let state = self.state.lock();
		state.sessions.contains_key(key) || state.setups.contains_key(key) || state.retries.contains_key(key)
	}

	/// Keys with a live session, sorted.
	pub(crate) fn keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = self.state.lock().sessions.keys().cloned().collect();
		keys.sort();
		keys
	}

	pub(crate) fn len(&self) -> usize {
		self.state.lock().sessions.len()
	}
}
