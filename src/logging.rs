//! Logging init for binaries and tests embedding the library.

use tracing_subscriber::EnvFilter;

/// Initialize tracing to stderr with an env-filter (default
/// `info,rivulet=debug`). Safe to call more than once; later calls are no-ops.
pub fn init_logging_stderr() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rivulet=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
