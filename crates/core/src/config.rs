use std::path::PathBuf;
use std::time::Duration;

/// Target dashboard: where to navigate and which page elements and remote
/// calls the session relies on.
#[derive(Debug, Clone)]
pub struct DashboardProfile {
	/// Page every session navigates to.
	pub url: String,
	/// Overlay shown while the map loads; the session waits until it is gone or hidden.
	pub loading_indicator: String,
	/// Search input the device key is typed into.
	pub search_input: String,
	/// Element that appears once search results render.
	pub result_table: String,
	/// Result rows; the row whose first cell contains the key is activated.
	pub result_row: String,
	/// Remote method carrying realtime telemetry.
	pub telemetry_method: String,
	/// Remote method carrying the multi-day uptime series.
	pub uptime_method: String,
	pub navigation_timeout: Duration,
	/// Bound on each wait-for-condition step after navigation.
	pub wait_timeout: Duration,
}

impl DashboardProfile {
	/// The GEODNET console miner map.
	pub fn geodnet() -> Self {
		Self {
			url: "https://console.geodnet.com/map".to_string(),
			loading_indicator: ".ui.active.dimmer.loadingVerifyMountpoint".to_string(),
			search_input: "#mount_query".to_string(),
			result_table: ".mineTableColumn".to_string(),
			result_row: "tr.mineTableColumn".to_string(),
			telemetry_method: "getRealData".to_string(),
			uptime_method: "getOnLine3DayMiners".to_string(),
			navigation_timeout: Duration::from_secs(90),
			wait_timeout: Duration::from_secs(90),
		}
	}
}

impl Default for DashboardProfile {
	fn default() -> Self {
		Self::geodnet()
	}
}

/// Browser launch settings.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
	pub headless: bool,
	/// Browser executable override; the driver searches the usual locations when unset.
	pub executable: Option<PathBuf>,
	/// Extra command-line switches appended to the driver defaults.
	pub args: Vec<String>,
}

impl Default for LaunchConfig {
	fn default() -> Self {
		Self {
			headless: true,
			executable: None,
			args: Vec::new(),
		}
	}
}

/// How long a snapshot reader waits for data to show up.
///
/// The reader first polls up to `attempts` times for any snapshot, then up to
/// `settle_attempts` more times while the effective satellite count is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
	pub attempts: u32,
	pub settle_attempts: u32,
	pub interval: Duration,
}

impl Default for WaitPolicy {
	fn default() -> Self {
		Self {
			attempts: 45,
			settle_attempts: 5,
			interval: Duration::from_secs(1),
		}
	}
}

/// Session manager configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
	pub dashboard: DashboardProfile,
	pub launch: LaunchConfig,
	/// Period of the per-session telemetry poll.
	pub poll_interval: Duration,
	/// Bound on a single telemetry read; exceeding it counts as a page failure.
	pub read_timeout: Duration,
	/// Sessions are torn down and rebuilt after this long.
	pub refresh_interval: Duration,
	/// Flat delay before a failed setup is attempted again.
	pub retry_backoff: Duration,
	/// Keys without client activity for longer than this are shut down.
	pub inactivity_timeout: Duration,
	/// Period of the idle reaper scan.
	pub reap_interval: Duration,
	pub wait: WaitPolicy,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self {
			dashboard: DashboardProfile::geodnet(),
			launch: LaunchConfig::default(),
			poll_interval: Duration::from_secs(1),
			read_timeout: Duration::from_secs(30),
			refresh_interval: Duration::from_secs(60 * 60),
			retry_backoff: Duration::from_secs(30),
			inactivity_timeout: Duration::from_secs(5 * 60),
			reap_interval: Duration::from_secs(60),
			wait: WaitPolicy::default(),
		}
	}
}
