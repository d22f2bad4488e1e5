//! HTTP API tests against a monitor backed by scripted browsers.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use geowatch::testing::ScriptedDriver;
use geowatch::{Monitor, MonitorConfig};
use geowatch_cli::server::router;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> (ScriptedDriver, Monitor, Router) {
	let driver = ScriptedDriver::new();
	let monitor = Monitor::new(MonitorConfig::default(), driver.driver());
	let app = router(monitor.clone());
	(driver, monitor, app)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
	let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
	(status, serde_json::from_slice(&bytes).unwrap())
}

async fn settle() {
	for _ in 0..20 {
		tokio::task::yield_now().await;
	}
}

#[tokio::test(start_paused = true)]
async fn listen_requires_key() {
	let (driver, _monitor, app) = app();

	for uri in ["/api/listen", "/api/listen?key="] {
		let (status, body) = get(&app, uri).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, json!({ "error": "Key is required" }));
	}
	assert_eq!(driver.launches(), 0);
}

#[tokio::test(start_paused = true)]
async fn duplicate_listen_is_rejected() {
	let (driver, monitor, app) = app();

	let (status, body) = get(&app, "/api/listen?key=K1").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "message": "Started listening for key: K1" }));

	let (status, body) = get(&app, "/api/listen?key=K1").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(
		body,
		json!({ "error": "Browser already listening or setup in progress for this key" })
	);

	settle().await;
	assert!(monitor.is_listening("K1"));
	assert_eq!(monitor.session_count(), 1);
	assert_eq!(driver.launches(), 1);
	assert!(monitor.activity().last_seen("K1").is_some());
}

#[tokio::test(start_paused = true)]
async fn shutdown_unknown_key_is_not_found() {
	let (_driver, _monitor, app) = app();

	let (status, body) = get(&app, "/api/shutdown").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], "Key is required");

	let (status, body) = get(&app, "/api/shutdown?key=K1").await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "No active browser found for this key" }));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_listening_session() {
	let (driver, monitor, app) = app();
	get(&app, "/api/listen?key=K1").await;
	settle().await;

	let (status, body) = get(&app, "/api/shutdown?key=K1").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "message": "Stopped listening for key: K1" }));
	assert!(!monitor.is_tracked("K1"));
	assert_eq!(driver.open_browsers(), 0);
}

#[tokio::test(start_paused = true)]
async fn stats_without_monitor_is_not_found() {
	let (driver, monitor, app) = app();

	let (status, body) = get(&app, "/api/stats").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"], "Key is required (last 5 chars in SN)");

	let (status, body) = get(&app, "/api/stats?key=K1&autostart=false").await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(
		body["error"],
		"Miner with key 'K1' is not monitored. Start monitor by calling /api/listen?key=K1 or use autostart=true parameter"
	);

	settle().await;
	assert!(!monitor.is_tracked("K1"));
	assert_eq!(driver.launches(), 0);
}

#[tokio::test(start_paused = true)]
async fn stats_autostart_serves_shaped_telemetry() {
	let (driver, monitor, app) = app();
	driver.push_telemetry(json!({
		"satelliteNum": 3,
		"lastPacketTime": "2024-01-02 05:59:58",
		"dataByte": 1024,
		"latency": 0.4,
		"satInfo": {
			"satinfoG": [{ "sys": "G", "prn": 5, "snr": 41.0 }, { "sys": "G", "prn": 7, "snr": 20.0 }],
			"satinfoE": [{ "sys": "E", "prn": 11, "snr": 32.0 }]
		}
	}));
	driver.push_uptime(json!({
		"xData": ["2024-01-02 5", "2024-01-02 6"],
		"yData": { "onLineRate": [100, null], "satRate": [97, 95] }
	}));

	let (status, body) = get(&app, "/api/stats?key=K1&autostart=TRUE").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["total_satellites"], 3);
	assert_eq!(body["effective_satellites"], 2);
	assert_eq!(body["last_packet_time"], "2024-01-02 05:59:58");
	assert_eq!(body["dataByte"], 1024);
	assert_eq!(body["latency"], 0.4);

	let channels: Vec<&str> = body["satInfo"]
		.as_array()
		.unwrap()
		.iter()
		.map(|sat| sat["sys_channel"].as_str().unwrap())
		.collect();
	assert_eq!(channels.len(), 3);
	assert!(channels.contains(&"G5") && channels.contains(&"E11"));

	assert_eq!(
		body["hourlyData"],
		json!([{ "timestamp": "2024-01-02T05:00:00Z", "onLineRate": 100, "satRate": 97 }])
	);
	assert!(monitor.is_listening("K1"));
}

#[tokio::test(start_paused = true)]
async fn stats_without_data_times_out() {
	let (_driver, _monitor, app) = app();
	get(&app, "/api/listen?key=K1").await;

	let (status, body) = get(&app, "/api/stats?key=K1").await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error"], "No data available for key 'K1' after 30 seconds");
}

#[tokio::test(start_paused = true)]
async fn health_reports_live_sessions() {
	let (_driver, _monitor, app) = app();
	let (status, body) = get(&app, "/health").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "status": "ok", "sessions": 0 }));

	get(&app, "/api/listen?key=K1").await;
	settle().await;
	let (_, body) = get(&app, "/health").await;
	assert_eq!(body["sessions"], 1);
}
