//! Wire types shared between the geowatch session manager and its HTTP surface.
//!
//! # Main Types
//!
//! - [`Snapshot`] - Telemetry captured from the dashboard's realtime channel
//! - [`Satellite`] - One tracked satellite inside a constellation bucket
//! - [`HourlySeries`] - Multi-day online-rate series attached to a snapshot
//! - [`StatsResponse`] - Body returned by `GET /api/stats`

pub mod snapshot;
pub mod stats;

pub use snapshot::{
	CONSTELLATION_BUCKETS, EFFECTIVE_SNR_THRESHOLD, HourlySeries, HourlyValues, Satellite, Snapshot,
};
pub use stats::{HourlyPoint, SatChannel, StatsResponse, hourly_timestamp};
