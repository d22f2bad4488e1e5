use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

pub fn init_logging(verbosity: u8) {
	// 0 = info, devtools chatter suppressed
	// 1 (-v) = debug for geowatch
	// 2+ (-vv) = trace for geowatch, debug for everything else
	let filter = match verbosity {
		0 => "info,chromiumoxide=warn",
		1 => "info,geowatch=debug,geowatch_cli=debug,chromiumoxide=warn",
		_ => "debug,geowatch=trace,geowatch_cli=trace",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
