use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use geowatch::{LaunchConfig, MonitorConfig};

#[derive(Parser, Debug)]
#[command(name = "geowatch")]
#[command(about = "Serve live GEODNET miner telemetry over HTTP")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Address to bind the HTTP server to
	#[arg(long, env = "HOST", default_value = "0.0.0.0")]
	pub host: String,

	/// Port to bind the HTTP server to
	#[arg(long, env = "PORT", default_value_t = 3000)]
	pub port: u16,

	/// Minutes between forced rebuilds of each browser session
	#[arg(long, env = "REFRESH_INTERVAL", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
	pub refresh_interval: u64,

	/// Minutes without listen/stats requests before a key is shut down
	#[arg(long, env = "INACTIVITY_TIMEOUT", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
	pub inactivity_timeout: u64,

	/// Chromium executable to launch instead of the auto-detected one
	#[arg(long, env = "CHROME_EXECUTABLE", value_name = "PATH")]
	pub chrome_executable: Option<PathBuf>,

	/// Show browser windows instead of running headless
	#[arg(long)]
	pub headful: bool,
}

impl Cli {
	pub fn addr(&self) -> Result<SocketAddr> {
		let (host, port) = (&self.host, self.port);
		format!("{host}:{port}")
			.parse()
			.with_context(|| format!("Invalid host/port combination: {host}:{port}"))
	}

	pub fn monitor_config(&self) -> MonitorConfig {
		MonitorConfig {
			launch: LaunchConfig {
				headless: !self.headful,
				executable: self.chrome_executable.clone(),
				..LaunchConfig::default()
			},
			refresh_interval: Duration::from_secs(self.refresh_interval * 60),
			inactivity_timeout: Duration::from_secs(self.inactivity_timeout * 60),
			..MonitorConfig::default()
		}
	}
}
