//! # Logging
//!
//! Tracing subscriber setup. `RUST_LOG` takes precedence; otherwise certwatch
//! logs at info, or debug with `--debug`.

use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is unset
#[must_use]
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "certwatch=debug"
    } else {
        "certwatch=info"
    }
}

/// Install the global subscriber
///
/// Logs go to stderr. Calling this twice is harmless; the second call is ignored.
pub fn init_logging(format: LogFormat, debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {e}");
    }
}
