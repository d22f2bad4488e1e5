//! HTTP surface over the session manager.
//!
//! - `GET /api/listen?key=K`: start monitoring `K`
//! - `GET /api/shutdown?key=K`: stop monitoring `K`
//! - `GET /api/stats?key=K[&autostart=true]`: latest telemetry for `K`
//! - `GET /health`: liveness and live session count

use std::future::Future;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use geowatch::Monitor;
use geowatch_protocol::StatsResponse;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::{self, ApiError};

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
	key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
	key: Option<String>,
	autostart: Option<String>,
}

impl StatsQuery {
	fn autostart(&self) -> bool {
		self.autostart.as_deref().is_some_and(|v| v.eq_ignore_ascii_case("true"))
	}
}

fn required(key: Option<String>, message: &'static str) -> error::Result<String> {
	key.filter(|k| !k.is_empty()).ok_or(ApiError::MissingKey(message))
}

pub fn router(monitor: Monitor) -> Router {
	Router::new()
		.route("/api/listen", get(listen))
		.route("/api/shutdown", get(shutdown))
		.route("/api/stats", get(stats))
		.route("/health", get(health))
		.layer(CorsLayer::permissive())
		.with_state(monitor)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve(listener: TcpListener, monitor: Monitor, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
	axum::serve(listener, router(monitor))
		.with_graceful_shutdown(shutdown)
		.await
		.context("HTTP server error")
}

async fn listen(State(monitor): State<Monitor>, Query(query): Query<KeyQuery>) -> error::Result<Json<Value>> {
	let key = required(query.key, "Key is required")?;
	if !monitor.start(&key) {
		return Err(ApiError::AlreadyListening);
	}
	monitor.touch(&key);
	info!(target = "geowatch.http", key = %key, "listen requested");
	Ok(Json(json!({ "message": format!("Started listening for key: {key}") })))
}

async fn shutdown(State(monitor): State<Monitor>, Query(query): Query<KeyQuery>) -> error::Result<Json<Value>> {
	let key = required(query.key, "Key is required")?;
	if !monitor.shutdown(&key).await {
		return Err(ApiError::NotFound("No active browser found for this key".to_string()));
	}
	info!(target = "geowatch.http", key = %key, "shutdown requested");
	Ok(Json(json!({ "message": format!("Stopped listening for key: {key}") })))
}

async fn stats(State(monitor): State<Monitor>, Query(query): Query<StatsQuery>) -> error::Result<Json<StatsResponse>> {
	let autostart = query.autostart();
	let key = required(query.key, "Key is required (last 5 chars in SN)")?;

	if !monitor.is_tracked(&key) {
		if !autostart {
			return Err(ApiError::NotFound(format!(
				"Miner with key '{key}' is not monitored. Start monitor by calling /api/listen?key={key} or use autostart=true parameter"
			)));
		}
		if monitor.start(&key) {
			info!(target = "geowatch.http", key = %key, "autostarted monitor");
		}
	}

	monitor.touch(&key);
	let snapshot = monitor
		.wait_for_snapshot(&key)
		.await
		.ok_or_else(|| ApiError::NotFound(format!("No data available for key '{key}' after 30 seconds")))?;
	Ok(Json(StatsResponse::from_snapshot(&snapshot)))
}

async fn health(State(monitor): State<Monitor>) -> Json<Value> {
	Json(json!({ "status": "ok", "sessions": monitor.session_count() }))
}
