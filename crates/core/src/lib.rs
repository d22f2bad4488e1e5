//! geowatch: per-key headless browser sessions that tap a web dashboard's
//! realtime telemetry.
//!
//! A [`Monitor`] keeps one Chromium session per device key pointed at the
//! GEODNET console map, intercepts the dashboard's own remote-call results
//! through a [`RemoteCallTap`], and caches the latest [`Snapshot`] per key.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use geowatch::{ChromiumDriver, Monitor, MonitorConfig};
//!
//! let monitor = Monitor::new(MonitorConfig::default(), Arc::new(ChromiumDriver));
//! monitor.start("ABCDE");
//! let snapshot = monitor.wait_for_snapshot("ABCDE").await;
//! ```

pub mod activity;
pub mod browser;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod js;
pub mod monitor;
pub mod reader;
pub mod reaper;
mod registry;
mod session;
pub mod store;
pub mod tap;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use activity::ActivityTracker;
pub use browser::{Browser, ChromiumDriver, Driver, Page};
pub use config::{DashboardProfile, LaunchConfig, MonitorConfig, WaitPolicy};
pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use geowatch_protocol::Snapshot;
pub use monitor::Monitor;
pub use reaper::spawn_reaper;
pub use store::{SnapshotStore, StoredSnapshot};
pub use tap::RemoteCallTap;
