//! Process termination signals.

use anyhow::Result;
#[cfg(unix)]
use anyhow::Context;
use tracing::info;

/// SIGTERM/SIGINT listener (Ctrl+C elsewhere), installed before serving so a
/// failure to register handlers aborts startup.
pub struct ShutdownSignal {
	#[cfg(unix)]
	sigterm: tokio::signal::unix::Signal,
	#[cfg(unix)]
	sigint: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
	#[cfg(unix)]
	pub fn install() -> Result<Self> {
		use tokio::signal::unix::{SignalKind, signal};

		let sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
		let sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
		Ok(Self { sigterm, sigint })
	}

	#[cfg(not(unix))]
	pub fn install() -> Result<Self> {
		Ok(Self {})
	}

	/// Resolves on the first termination signal.
	#[cfg(unix)]
	pub async fn wait(mut self) {
		tokio::select! {
			_ = self.sigterm.recv() => info!(target = "geowatch", "received SIGTERM, shutting down"),
			_ = self.sigint.recv() => info!(target = "geowatch", "received SIGINT, shutting down"),
		}
	}

	#[cfg(not(unix))]
	pub async fn wait(self) {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!(target = "geowatch", "received Ctrl+C, shutting down");
		}
	}
}
