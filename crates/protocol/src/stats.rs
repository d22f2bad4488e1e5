//! Response body for `GET /api/stats` and the reshaping helpers behind it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::{HourlySeries, Snapshot};

/// Flattened telemetry summary served to HTTP clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
	pub total_satellites: Option<Value>,
	pub effective_satellites: usize,
	pub last_packet_time: Option<Value>,
	#[serde(rename = "dataByte")]
	pub data_byte: Option<Value>,
	pub latency: Option<Value>,
	#[serde(rename = "satInfo")]
	pub sat_info: Vec<SatChannel>,
	#[serde(rename = "hourlyData")]
	pub hourly_data: Option<Vec<HourlyPoint>>,
}

/// One satellite in the flattened list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatChannel {
	pub sys_channel: String,
	/// SNR exactly as the dashboard sent it.
	pub snr: Value,
}

/// One hour of the uptime series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
	pub timestamp: String,
	#[serde(rename = "onLineRate")]
	pub on_line_rate: Value,
	#[serde(rename = "satRate")]
	pub sat_rate: Option<Value>,
}

impl StatsResponse {
	pub fn from_snapshot(snapshot: &Snapshot) -> Self {
		Self {
			total_satellites: snapshot.satellite_num.clone(),
			effective_satellites: snapshot.effective_satellites(),
			last_packet_time: snapshot.last_packet_time.clone(),
			data_byte: snapshot.data_byte.clone(),
			latency: snapshot.latency.clone(),
			sat_info: flatten_satellites(snapshot),
			hourly_data: snapshot.hourly.as_ref().and_then(reshape_hourly),
		}
	}
}

/// Flattens every constellation bucket into one list of channel/SNR pairs.
pub fn flatten_satellites(snapshot: &Snapshot) -> Vec<SatChannel> {
	snapshot
		.sat_info
		.iter()
		.flat_map(|buckets| buckets.values())
		.flatten()
		.map(|sat| SatChannel {
			sys_channel: sat.channel_code(),
			snr: sat.snr.clone(),
		})
		.collect()
}

/// Zips the column-oriented series into points.
///
/// Returns `None` when the series has no hour labels. Points whose label cannot
/// be parsed are dropped, as are points whose online rate is missing. An
/// explicit `null` online rate counts as missing too, which is stricter than
/// checking for absence alone.
pub fn reshape_hourly(series: &HourlySeries) -> Option<Vec<HourlyPoint>> {
	let labels = series.x_data.as_ref()?;

	let points = labels
		.iter()
		.enumerate()
		.filter_map(|(index, label)| {
			let on_line_rate = series.y_data.on_line_rate.get(index).filter(|v| !v.is_null())?;
			let timestamp = hourly_timestamp(label)?;
			Some(HourlyPoint {
				timestamp,
				on_line_rate: on_line_rate.clone(),
				sat_rate: series.y_data.sat_rate.get(index).cloned(),
			})
		})
		.collect();

	Some(points)
}

/// Converts a `YYYY-MM-DD H` label into an ISO-8601 UTC timestamp on the hour.
///
/// `"2024-01-02 5"` becomes `"2024-01-02T05:00:00Z"`.
pub fn hourly_timestamp(label: &str) -> Option<String> {
	let (date, hour) = label.trim().split_once(' ')?;
	let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
	let hour: u32 = hour.trim().parse().ok()?;
	let at = date.and_hms_opt(hour, 0, 0)?;
	Some(at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}
