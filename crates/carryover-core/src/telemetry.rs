//! Tracing setup for the `carryover` binary.
//!
//! Call [`init_tracing`] once at program start. Later calls are ignored
//! because the global subscriber can only be installed once per process.
//!
//! Without `RUST_LOG`, only carryover's own events (transform passes, walks,
//! baseline resolution from [`crate::obs`]) are shown at the requested level.
//! The tree walker and glob crates stay at `warn`, so `--verbose` does not
//! flood stderr with per-directory noise from a large checkout.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,carryover_core={level},carryover={level}")
}

/// Install the global subscriber.
///
/// With `json` set, log lines are newline-delimited JSON and carry the
/// enclosing `carryover.transform` span, so a pass's root and mode appear on
/// every event it emits. Logs go to stderr; stdout is reserved for command
/// results.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}
