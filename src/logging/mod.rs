//! Tracing setup
//!
//! Library code only emits `tracing` events. The binary installs the
//! subscriber once at startup. Events go to stderr so CLI output on stdout
//! stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Filter directive for the requested verbosity
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Initialize tracing for the process
///
/// Call early in main() before any logging occurs.
/// `RUST_LOG` overrides the verbosity flag when set.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(filter)
        .try_init();
}
