//! Log output setup.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    init_tracing_with("info");
}

/// Like [`init_tracing`], with `default_filter` used when `RUST_LOG` is
/// unset or invalid (e.g. `"matchloop_registry=debug,info"`).
pub fn init_tracing_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
