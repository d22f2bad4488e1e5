//! One-way cache identifiers for device keys.

use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 of a device key as lowercase hex.
///
/// The snapshot store is indexed by fingerprint so raw keys never appear in
/// its key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
	pub fn of(key: &str) -> Self {
		let digest = Sha256::digest(key.as_bytes());
		Self(format!("{:x}", digest))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Fingerprint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
