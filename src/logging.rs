//! Installing a tracing subscriber for shell diagnostics.
//!
//! The library only emits `tracing` events; hosts that do not install their
//! own subscriber can call [`install`]. `RUST_LOG` overrides the level
//! derived from the options.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::ShellOptions;

/// Default filter directive for `options`.
pub fn default_directive(options: &ShellOptions) -> &'static str {
    if options.debug {
        "mosaic=debug,warn"
    } else {
        "warn"
    }
}

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber was already set, in which case
/// nothing changes.
pub fn install(options: &ShellOptions) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(options)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
