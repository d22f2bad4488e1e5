use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use geowatch::{ChromiumDriver, Monitor, spawn_reaper};
use geowatch_cli::cli::Cli;
use geowatch_cli::signal::ShutdownSignal;
use geowatch_cli::{logging, server};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let addr = cli.addr()?;
	let monitor = Monitor::new(cli.monitor_config(), Arc::new(ChromiumDriver));
	let signals = ShutdownSignal::install()?;

	let listener = TcpListener::bind(addr)
		.await
		.with_context(|| format!("Failed to bind HTTP server to {addr}"))?;
	info!(target = "geowatch.http", %addr, "server listening");

	let stop = CancellationToken::new();
	let reaper = spawn_reaper(monitor.clone(), stop.clone());
	{
		let stop = stop.clone();
		tokio::spawn(async move {
			signals.wait().await;
			stop.cancel();
		});
	}

	let served = {
		let stop = stop.clone();
		server::serve(listener, monitor.clone(), async move { stop.cancelled().await }).await
	};

	stop.cancel();
	if let Err(err) = reaper.await {
		warn!(target = "geowatch", error = %err, "idle reaper task failed");
	}
	monitor.shutdown_all().await;
	served
}
