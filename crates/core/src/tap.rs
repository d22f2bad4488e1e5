//! Side-channel tap on the dashboard's remote-call results.
//!
//! The dashboard receives telemetry through its own Meteor method calls. The
//! tap wraps the page's call entry point once per session and records the last
//! result of the telemetry and uptime methods in page-local slots; the poll
//! loop reads those slots back out through [`RemoteCallTap::read`].

use geowatch_protocol::Snapshot;
use serde_json::Value;

use crate::browser::Page;
use crate::config::DashboardProfile;
use crate::error::{Error, Result};
use crate::js;

pub const TELEMETRY_SLOT: &str = "telemetry";
pub const UPTIME_SLOT: &str = "uptime";

#[derive(Debug, Clone)]
pub struct RemoteCallTap {
	install_script: String,
}

impl RemoteCallTap {
	pub fn new(telemetry_method: &str, uptime_method: &str) -> Self {
		Self {
			install_script: js::tap_install(&[(telemetry_method, TELEMETRY_SLOT), (uptime_method, UPTIME_SLOT)]),
		}
	}

	pub fn for_dashboard(profile: &DashboardProfile) -> Self {
		Self::new(&profile.telemetry_method, &profile.uptime_method)
	}

	/// Installs the wrapper into `page`.
	///
	/// Fails with [`Error::Bridge`] when the page has no remote-call connection.
	pub async fn install(&self, page: &dyn Page) -> Result<()> {
		match page.evaluate(&self.install_script).await? {
			Value::Bool(true) => Ok(()),
			_ => Err(Error::Bridge("page has no Meteor connection".to_string())),
		}
	}

	/// Returns the captured telemetry combined with the latest uptime series,
	/// or `None` while no telemetry has arrived.
	pub async fn read(&self, page: &dyn Page) -> Result<Option<Snapshot>> {
		let raw = page.evaluate(js::TAP_READ).await?;
		let Some(encoded) = raw.as_str() else {
			return Err(Error::JsEval(format!("unexpected tap reading: {raw}")));
		};
		Ok(serde_json::from_str(encoded)?)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::testing::ScriptedDriver;

	#[tokio::test]
	async fn install_requires_remote_call_connection() {
		let driver = ScriptedDriver::new();
		let page = driver.page();
		let tap = RemoteCallTap::for_dashboard(&DashboardProfile::geodnet());

		tap.install(page.as_ref()).await.unwrap();

		driver.set_remote_calls_available(false);
		let err = tap.install(page.as_ref()).await.unwrap_err();
		assert!(matches!(err, Error::Bridge(_)));
	}

	#[tokio::test]
	async fn read_is_none_until_telemetry_arrives() {
		let driver = ScriptedDriver::new();
		let page = driver.page();
		let tap = RemoteCallTap::for_dashboard(&DashboardProfile::geodnet());

		assert_eq!(tap.read(page.as_ref()).await.unwrap(), None);

		driver.push_telemetry(json!({ "lastPacketTime": "t1", "satelliteNum": 4 }));
		driver.push_uptime(json!({ "xData": ["2024-01-02 5"], "yData": { "onLineRate": [100], "satRate": [90] } }));

		let snapshot = tap.read(page.as_ref()).await.unwrap().unwrap();
		assert_eq!(snapshot.last_packet_time, Some(json!("t1")));
		assert_eq!(snapshot.hourly.unwrap().y_data.on_line_rate, vec![json!(100)]);
	}

	#[tokio::test]
	async fn undecodable_reading_is_a_payload_error() {
		let driver = ScriptedDriver::new();
		let page = driver.page();
		let tap = RemoteCallTap::for_dashboard(&DashboardProfile::geodnet());

		driver.push_telemetry(json!("telemetry offline"));

		let err = tap.read(page.as_ref()).await.unwrap_err();
		assert!(err.is_payload());
	}

	#[tokio::test]
	async fn malformed_uptime_keeps_telemetry() {
		let driver = ScriptedDriver::new();
		let page = driver.page();
		let tap = RemoteCallTap::for_dashboard(&DashboardProfile::geodnet());

		driver.push_telemetry(json!({
			"lastPacketTime": "t1",
			"satelliteNum": 4,
			"dataByte": 512,
			"satInfo": { "satinfoG": [{ "sys": null, "prn": 3, "snr": "40" }] }
		}));
		for uptime in [
			json!({ "yData": null }),
			json!({ "xData": ["2024-01-02 5"], "yData": { "onLineRate": [100], "satRate": null } }),
			json!("unavailable"),
		] {
			driver.push_uptime(uptime);
			let snapshot = tap.read(page.as_ref()).await.unwrap().unwrap();
			assert_eq!(snapshot.last_packet_time, Some(json!("t1")));
			assert_eq!(snapshot.data_byte, Some(json!(512)));
			assert_eq!(snapshot.effective_satellites(), 1);
		}
	}
}
