//! Logging and tracing configuration
//!
//! APDU frames are traced at debug level under the `ragger::apdu` target, so
//! `RUST_LOG=ragger::apdu=debug` shows the exchanges alone.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "ragger=info,warn";

/// Filter used by `--verbose`
pub const VERBOSE_FILTER: &str = "ragger=debug,info";

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    init_cli_with(DEFAULT_FILTER);
}

/// Initialize tracing with a fallback filter for when `RUST_LOG` is unset
pub fn init_cli_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
