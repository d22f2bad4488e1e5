//! Background eviction of keys without recent client activity.

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::monitor::Monitor;

/// Spawns the idle reaper: every `reap_interval` it shuts down keys idle for
/// longer than `inactivity_timeout`. Runs until `stop` is cancelled.
pub fn spawn_reaper(monitor: Monitor, stop: CancellationToken) -> JoinHandle<()> {
	tokio::spawn(async move {
		let period = monitor.config().reap_interval;
		let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
		ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
		loop {
			tokio::select! {
				_ = stop.cancelled() => break,
				_ = ticks.tick() => {
					let reaped = monitor.reap_idle(Instant::now()).await;
					if !reaped.is_empty() {
						debug!(target = "geowatch", count = reaped.len(), "reaped idle keys");
					}
				}
			}
		}
		debug!(target = "geowatch", "idle reaper stopped");
	})
}
