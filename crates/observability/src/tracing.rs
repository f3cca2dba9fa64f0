//! Tracing/logging initialization.
//!
//! Role admin crates only emit `tracing` events; this installs the subscriber
//! that turns them into JSON lines. Verbosity follows `RUST_LOG`, e.g.
//! `RUST_LOG=useradmin_infra=debug,info`.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Like [`init`], with `default` used when `RUST_LOG` is unset or invalid.
pub fn init_with_default(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .with_current_span(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init();
        init_with_default("debug");
        ::tracing::info!(check = "ok", "subscriber installed");
    }
}
