//! Test logging

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a `tracing` subscriber writing to the test output (call once)
///
/// The filter comes from `RUST_LOG` and defaults to `debug` for the
/// nested serializer crates.
pub fn init_test_logging() {
	INIT.call_once(|| {
		let filter = tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("reinhardt_nested=debug"));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_test_writer()
			.try_init();
	});
}
