use tracing_subscriber::EnvFilter;

use crate::config::LogSettings;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins over the configured filter. Returns `false` when a subscriber was
/// already installed.
pub fn init_tracing(settings: &LogSettings) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
