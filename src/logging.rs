//! Process-wide tracing setup.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `POPGRID_LOG=popgrid=debug`.
pub const LOG_ENV: &str = "POPGRID_LOG";

static INIT: Once = Once::new();

/// Install a stderr `fmt` subscriber filtered by [`LOG_ENV`] (default `warn`).
///
/// Safe to call any number of times from any thread; only the first call
/// has an effect. If the host already installed a global subscriber, that one
/// is left in place.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
