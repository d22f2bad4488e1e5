//! Telemetry snapshot as delivered by the dashboard's `getRealData` method.
//!
//! Fields the dashboard adds over time are kept in `extra` so a snapshot can be
//! re-serialized without loss. Scalar fields the HTTP layer only passes through
//! are held as raw [`Value`]s.
//!
//! Decoding is lenient below the top level: a malformed uptime series decodes
//! as no series, and malformed satellite entries are skipped, so the scalar
//! telemetry is never lost to a bad sub-field.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Minimum signal-to-noise ratio for a satellite to count as effective.
pub const EFFECTIVE_SNR_THRESHOLD: f64 = 32.0;

/// Constellation buckets considered by [`Snapshot::effective_satellites`]:
/// GPS, GLONASS, Galileo and BeiDou.
pub const CONSTELLATION_BUCKETS: [&str; 4] = ["satinfoG", "satinfoR", "satinfoE", "satinfoC"];

/// Latest telemetry observed for one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub satellite_num: Option<Value>,
	#[serde(default, deserialize_with = "satellite_buckets", skip_serializing_if = "Option::is_none")]
	pub sat_info: Option<BTreeMap<String, Vec<Satellite>>>,
	/// De-duplication key: a snapshot only replaces a stored one when this differs.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_packet_time: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data_byte: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub latency: Option<Value>,
	/// Uptime series captured from `getOnLine3DayMiners`, attached by the tap.
	#[serde(default, deserialize_with = "or_none", skip_serializing_if = "Option::is_none")]
	pub hourly: Option<HourlySeries>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// One satellite entry inside a constellation bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
	/// Constellation system code (`G`, `R`, `E`, `C`, ...).
	#[serde(default)]
	pub sys: Value,
	/// Pseudo-random noise number; numeric or textual depending on the feed.
	#[serde(default)]
	pub prn: Value,
	/// Signal-to-noise ratio as sent: a number, a numeric string or absent.
	#[serde(default)]
	pub snr: Value,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Hourly online-rate series, column oriented as the dashboard sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
	/// Hour labels in `YYYY-MM-DD H` form.
	#[serde(rename = "xData", default, skip_serializing_if = "Option::is_none")]
	pub x_data: Option<Vec<String>>,
	#[serde(rename = "yData", default, deserialize_with = "null_as_default")]
	pub y_data: HourlyValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyValues {
	#[serde(rename = "onLineRate", default, deserialize_with = "null_as_default")]
	pub on_line_rate: Vec<Value>,
	#[serde(rename = "satRate", default, deserialize_with = "null_as_default")]
	pub sat_rate: Vec<Value>,
}

/// Decodes `T`, treating null or a value of the wrong shape as `None`.
fn or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let raw = Option::<Value>::deserialize(deserializer)?;
	Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de> + Default,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decodes constellation buckets, dropping entries that are not satellite
/// objects. A bucket that is not a list decodes as empty.
fn satellite_buckets<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, Vec<Satellite>>>, D::Error>
where
	D: Deserializer<'de>,
{
	let Some(Value::Object(buckets)) = Option::<Value>::deserialize(deserializer)? else {
		return Ok(None);
	};
	let buckets = buckets
		.into_iter()
		.map(|(name, entries)| {
			let satellites = match entries {
				Value::Array(items) => items
					.into_iter()
					.filter_map(|item| serde_json::from_value(item).ok())
					.collect(),
				_ => Vec::new(),
			};
			(name, satellites)
		})
		.collect();
	Ok(Some(buckets))
}

impl Snapshot {
	/// Counts satellites at or above [`EFFECTIVE_SNR_THRESHOLD`] across the
	/// four [`CONSTELLATION_BUCKETS`].
	pub fn effective_satellites(&self) -> usize {
		self.effective_satellites_with(EFFECTIVE_SNR_THRESHOLD)
	}

	/// Counts satellites with `snr >= threshold` across the four constellation buckets.
	///
	/// Buckets outside [`CONSTELLATION_BUCKETS`] and satellites without an SNR
	/// reading never count.
	pub fn effective_satellites_with(&self, threshold: f64) -> usize {
		let Some(buckets) = &self.sat_info else {
			return 0;
		};

		CONSTELLATION_BUCKETS
			.iter()
			.filter_map(|name| buckets.get(*name))
			.flatten()
			.filter(|sat| sat.snr_value().is_some_and(|snr| snr >= threshold))
			.count()
	}

	/// Returns true when `other` carries a different `lastPacketTime`.
	pub fn is_newer_packet_than(&self, other: &Snapshot) -> bool {
		self.last_packet_time != other.last_packet_time
	}
}

impl Satellite {
	/// Channel code: system code followed by the PRN, e.g. `G12`.
	pub fn channel_code(&self) -> String {
		format!("{}{}", text(&self.sys), text(&self.prn))
	}

	/// SNR as a number; numeric strings are parsed, anything else is `None`.
	pub fn snr_value(&self) -> Option<f64> {
		match &self.snr {
			Value::Number(n) => n.as_f64(),
			Value::String(s) => s.trim().parse().ok(),
			_ => None,
		}
	}
}

fn text(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn bucket(sys: &str, snrs: &[f64]) -> Vec<Satellite> {
		snrs.iter()
			.enumerate()
			.map(|(i, snr)| Satellite {
				sys: json!(sys),
				prn: json!(i + 1),
				snr: json!(snr),
				..Default::default()
			})
			.collect()
	}

	#[test]
	fn effective_satellites_counts_threshold_inclusively_across_buckets() {
		let mut sat_info = BTreeMap::new();
		for (name, sys) in CONSTELLATION_BUCKETS.iter().zip(["G", "R", "E", "C"]) {
			sat_info.insert(name.to_string(), bucket(sys, &[20.0, 32.0, 40.0]));
		}
		let snapshot = Snapshot {
			sat_info: Some(sat_info),
			..Default::default()
		};

		assert_eq!(snapshot.effective_satellites(), 8);
	}

	#[test]
	fn effective_satellites_ignores_unknown_buckets_and_missing_snr() {
		let mut sat_info = BTreeMap::new();
		sat_info.insert("satinfoJ".to_string(), bucket("J", &[50.0, 50.0]));
		sat_info.insert(
			"satinfoG".to_string(),
			vec![Satellite {
				sys: json!("G"),
				prn: json!(3),
				snr: Value::Null,
				..Default::default()
			}],
		);
		let snapshot = Snapshot {
			sat_info: Some(sat_info),
			..Default::default()
		};

		assert_eq!(snapshot.effective_satellites(), 0);
		assert_eq!(Snapshot::default().effective_satellites(), 0);
	}

	#[test]
	fn deserializes_dashboard_payload_and_keeps_unknown_fields() {
		let snapshot: Snapshot = serde_json::from_value(json!({
			"satelliteNum": 31,
			"lastPacketTime": "2024-01-02 05:13:07",
			"dataByte": 1024,
			"latency": 0.4,
			"mountpoint": "ABCDE",
			"satInfo": {
				"satinfoG": [{ "sys": "G", "prn": 5, "snr": 41 }],
				"satinfoC": [{ "sys": "C", "prn": "19", "snr": 30, "elev": 12 }]
			},
			"hourly": {
				"xData": ["2024-01-02 5"],
				"yData": { "onLineRate": [100], "satRate": [97] }
			}
		}))
		.unwrap();

		assert_eq!(snapshot.satellite_num, Some(json!(31)));
		assert_eq!(snapshot.extra.get("mountpoint"), Some(&json!("ABCDE")));
		assert_eq!(snapshot.effective_satellites(), 1);

		let beidou = &snapshot.sat_info.as_ref().unwrap()["satinfoC"][0];
		assert_eq!(beidou.channel_code(), "C19");
		assert_eq!(beidou.extra.get("elev"), Some(&json!(12)));

		let hourly = snapshot.hourly.unwrap();
		assert_eq!(hourly.x_data.unwrap(), vec!["2024-01-02 5".to_string()]);
		assert_eq!(hourly.y_data.sat_rate, vec![json!(97)]);
	}

	#[test]
	fn packet_time_comparison_drives_newness() {
		let first = Snapshot {
			last_packet_time: Some(json!("t1")),
			satellite_num: Some(json!(3)),
			..Default::default()
		};
		let same_time = Snapshot {
			last_packet_time: Some(json!("t1")),
			satellite_num: Some(json!(9)),
			..Default::default()
		};
		let later = Snapshot {
			last_packet_time: Some(json!("t2")),
			..Default::default()
		};

		assert!(!same_time.is_newer_packet_than(&first));
		assert!(later.is_newer_packet_than(&first));
	}

	#[test]
	fn bad_sub_fields_do_not_reject_the_snapshot() {
		let snapshot: Snapshot = serde_json::from_value(json!({
			"lastPacketTime": "t1",
			"satelliteNum": 4,
			"satInfo": {
				"satinfoG": [
					{ "sys": null, "prn": 3, "snr": "40" },
					"garbage",
					{ "sys": "G", "prn": 9, "snr": 12 }
				],
				"satinfoR": "not-a-list"
			},
			"hourly": { "xData": ["2024-01-02 5"], "yData": null }
		}))
		.unwrap();

		assert_eq!(snapshot.last_packet_time, Some(json!("t1")));
		let buckets = snapshot.sat_info.as_ref().unwrap();
		assert_eq!(buckets["satinfoG"].len(), 2);
		assert!(buckets["satinfoR"].is_empty());
		assert_eq!(buckets["satinfoG"][0].channel_code(), "3");
		assert_eq!(snapshot.effective_satellites(), 1);
		assert!(snapshot.hourly.unwrap().y_data.on_line_rate.is_empty());
	}

	#[test]
	fn undecodable_hourly_series_becomes_none() {
		let snapshot: Snapshot = serde_json::from_value(json!({
			"lastPacketTime": "t1",
			"hourly": { "xData": "2024-01-02 5", "yData": { "satRate": null } }
		}))
		.unwrap();

		assert_eq!(snapshot.last_packet_time, Some(json!("t1")));
		assert_eq!(snapshot.hourly, None);
	}
}
