//! Logging setup shared by the `lift` binary and tests.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter for the CLI.
///
/// Warnings only, so prompts and tables on stdout are not interleaved with
/// diagnostics. `RUST_LOG` still wins when set.
pub const CLI_DEFAULT_LEVEL: &str = "warn";

/// Initialize logging for the CLI.
///
/// `verbose` raises the default level to `debug` for this crate.
pub fn init(verbose: bool) {
    if verbose {
        init_with_level("lift_core=debug,lift=debug,info")
    } else {
        init_with_level(CLI_DEFAULT_LEVEL)
    }
}

/// Initialize logging with a specific default filter directive.
///
/// Output goes to stderr in compact form. `RUST_LOG` overrides `default_level`.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
