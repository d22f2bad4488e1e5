//! Last client activity per raw key, consumed by the idle reaper.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct ActivityTracker {
	last_seen: Mutex<HashMap<String, Instant>>,
}

impl ActivityTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records activity for `key` now.
	pub fn touch(&self, key: &str) {
		self.touch_at(key, Instant::now());
	}

	pub fn touch_at(&self, key: &str, at: Instant) {
		self.last_seen.lock().insert(key.to_string(), at);
	}

	pub fn last_seen(&self, key: &str) -> Option<Instant> {
		self.last_seen.lock().get(key).copied()
	}

	/// Keys whose last activity is more than `timeout` before `now`, sorted.
	pub fn idle_keys(&self, now: Instant, timeout: Duration) -> Vec<String> {
		let mut idle: Vec<String> = self
			.last_seen
			.lock()
			.iter()
			.filter(|(_, seen)| now.saturating_duration_since(**seen) > timeout)
			.map(|(key, _)| key.clone())
			.collect();
		idle.sort();
		idle
	}

	pub fn remove(&self, key: &str) -> Option<Instant> {
		self.last_seen.lock().remove(key)
	}

	pub fn clear(&self) {
		self.last_seen.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.last_seen.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
