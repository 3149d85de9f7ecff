//! Diagnostic tracing for the CLI.
//!
//! Diagnostics go to stderr so stdout carries only the run summary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used with `--debug` when `RUST_LOG` is unset
const DEBUG_FILTER: &str = "warn,openhoud_agent=debug,openhoud_llm=debug,openhoud=debug";

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or [`DEBUG_FILTER`] when
/// `debug` is on.
///
/// # Example
/// ```bash
/// RUST_LOG=openhoud_agent=info openhoud "List repo root"
/// ```
pub fn init(debug: bool) {
    let fallback = if debug { DEBUG_FILTER } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
