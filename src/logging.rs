//! Tracing subscriber setup for the CLI.

use std::env;

use tracing_subscriber::EnvFilter;

/// Environment variable holding an explicit `EnvFilter` directive.
pub const LOG_ENV: &str = "UPVOTES_LOG";

/// Set by GitHub Actions when a workflow is re-run with debug logging.
const RUNNER_DEBUG: &str = "RUNNER_DEBUG";

/// Default filter directive for the requested verbosity.
#[must_use]
pub const fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "github_upvotes=debug,warn"
    } else {
        "github_upvotes=info,warn"
    }
}

fn runner_debug_enabled() -> bool {
    env::var(RUNNER_DEBUG).is_ok_and(|value| value == "1")
}

/// Installs the global stderr subscriber.
///
/// `UPVOTES_LOG` wins when set; otherwise debug output is enabled by
/// `verbose` or by `RUNNER_DEBUG=1`.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(default_directive(verbose || runner_debug_enabled()))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
