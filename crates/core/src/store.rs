//! Latest-snapshot cache keyed by [`Fingerprint`].

use std::collections::HashMap;

use geowatch_protocol::Snapshot;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::fingerprint::Fingerprint;

/// A snapshot together with the instant it was accepted.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
	pub snapshot: Snapshot,
	pub received_at: Instant,
}

/// Holds at most one snapshot per fingerprint; no history.
#[derive(Debug, Default)]
pub struct SnapshotStore {
	entries: Mutex<HashMap<Fingerprint, StoredSnapshot>>,
}

impl SnapshotStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `snapshot` if the slot is empty or its `lastPacketTime` differs
	/// from the stored one. Returns whether the store changed.
	///
	/// Compare and write happen under one lock so concurrent offers for the
	/// same fingerprint cannot both win.
	pub fn offer(&self, fingerprint: &Fingerprint, snapshot: Snapshot) -> bool {
		let mut entries = self.entries.lock();
		if let Some(existing) = entries.get(fingerprint) {
			if !snapshot.is_newer_packet_than(&existing.snapshot) {
				return false;
			}
		}
		entries.insert(
			fingerprint.clone(),
			StoredSnapshot {
				snapshot,
				received_at: Instant::now(),
			},
		);
		true
	}

	pub fn get(&self, fingerprint: &Fingerprint) -> Option<Snapshot> {
		self.entries.lock().get(fingerprint).map(|entry| entry.snapshot.clone())
	}

	pub fn entry(&self, fingerprint: &Fingerprint) -> Option<StoredSnapshot> {
		self.entries.lock().get(fingerprint).cloned()
	}

	pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
		self.entries.lock().contains_key(fingerprint)
	}

	pub fn remove(&self, fingerprint: &Fingerprint) -> Option<StoredSnapshot> {
		self.entries.lock().remove(fingerprint)
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
