//! Logging setup
//!
//! Everything goes to stderr; stdout carries command output only.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "RENDERMAN_LOG";

/// Initialize `tracing` logging.
///
/// `RENDERMAN_LOG` wins when set; otherwise the level follows `--debug` and
/// `--quiet`.
pub fn init(debug: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(default_level(debug, quiet))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

fn default_level(debug: bool, quiet: bool) -> &'static str {
    match (debug, quiet) {
        (true, _) => "debug",
        (false, true) => "error",
        (false, false) => "warn",
    }
}
