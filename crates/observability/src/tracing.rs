//! Subscriber installation.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filtering comes from `RUST_LOG`, defaulting to `info`. Output is JSON
/// lines when `LOG_FORMAT=json`, human-readable otherwise. Repeated calls
/// are no-ops so tests can initialize freely.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }
}
