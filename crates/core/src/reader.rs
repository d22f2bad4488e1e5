//! Bounded wait for a key's snapshot.

use geowatch_protocol::Snapshot;
use tracing::debug;

use crate::config::WaitPolicy;
use crate::fingerprint::Fingerprint;
use crate::monitor::Monitor;
use crate::store::SnapshotStore;

impl Monitor {
	/// Waits for a snapshot for `key` using the configured [`WaitPolicy`].
	pub async fn wait_for_snapshot(&self, key: &str) -> Option<Snapshot> {
		let policy = self.config().wait;
		wait_for_snapshot(self.store(), &Fingerprint::of(key), policy).await
	}
}

/// Polls `store` until a snapshot shows up, then gives the effective
/// satellite count a short window to become non-zero.
///
/// Returns the freshest snapshot seen, or `None` if none arrived within
/// `policy.attempts` polls.
pub async fn wait_for_snapshot(store: &SnapshotStore, fingerprint: &Fingerprint, policy: WaitPolicy) -> Option<Snapshot> {
	let mut remaining = policy.attempts;
	let mut snapshot = store.get(fingerprint);
	while snapshot.is_none() && remaining > 0 {
		tokio::time::sleep(policy.interval).await;
		remaining -= 1;
		snapshot = store.get(fingerprint);
	}
	let mut snapshot = snapshot?;

	for _ in 0..policy.settle_attempts {
		if snapshot.effective_satellites() > 0 {
			break;
		}
		tokio::time::sleep(policy.interval).await;
		if let Some(latest) = store.get(fingerprint) {
			snapshot = latest;
		}
	}
	debug!(
		target = "geowatch",
		fingerprint = %fingerprint,
		effective = snapshot.effective_satellites(),
		"snapshot ready"
	);
	Some(snapshot)
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use serde_json::json;
	use tokio::time::Instant;

	use super::*;

	fn snapshot(packet: &str, snrs: &[f64]) -> Snapshot {
		let sats: Vec<_> = snrs.iter().map(|snr| json!({ "sys": "G", "prn": 1, "snr": snr })).collect();
		serde_json::from_value(json!({ "lastPacketTime": packet, "satInfo": { "satinfoG": sats } })).unwrap()
	}

	#[tokio::test(start_paused = true)]
	async fn gives_up_after_attempts() {
		let store = SnapshotStore::new();
		let started = Instant::now();

		let found = wait_for_snapshot(&store, &Fingerprint::of("K1"), WaitPolicy::default()).await;
		assert!(found.is_none());
		assert_eq!(started.elapsed(), Duration::from_secs(45));
	}

	#[tokio::test(start_paused = true)]
	async fn returns_immediately_when_satellites_are_effective() {
		let store = SnapshotStore::new();
		let fingerprint = Fingerprint::of("K1");
		store.offer(&fingerprint, snapshot("t1", &[40.0]));
		let started = Instant::now();

		let found = wait_for_snapshot(&store, &fingerprint, WaitPolicy::default()).await.unwrap();
		assert_eq!(found.effective_satellites(), 1);
		assert_eq!(started.elapsed(), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn settles_until_effective_count_appears() {
		let store = Arc::new(SnapshotStore::new());
		let fingerprint = Fingerprint::of("K1");
		store.offer(&fingerprint, snapshot("t1", &[10.0]));

		let writer = {
			let store = Arc::clone(&store);
			let fingerprint = fingerprint.clone();
			tokio::spawn(async move {
				tokio::time::sleep(Duration::from_millis(2500)).await;
				store.offer(&fingerprint, snapshot("t2", &[35.0, 36.0]));
			})
		};

		let started = Instant::now();
		let found = wait_for_snapshot(&store, &fingerprint, WaitPolicy::default()).await.unwrap();
		assert_eq!(found.effective_satellites(), 2);
		assert_eq!(started.elapsed(), Duration::from_secs(3));
		writer.await.unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn settle_window_is_bounded() {
		let store = SnapshotStore::new();
		let fingerprint = Fingerprint::of("K1");
		store.offer(&fingerprint, snapshot("t1", &[]));
		let started = Instant::now();

		let found = wait_for_snapshot(&store, &fingerprint, WaitPolicy::default()).await.unwrap();
		assert_eq!(found.effective_satellites(), 0);
		assert_eq!(started.elapsed(), Duration::from_secs(5));
	}
}
