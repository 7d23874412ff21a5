// src/logging.rs
//! Subscriber setup for embedders that do not install their own.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `opname=info`. Later calls are no-ops, and so is the first one if the
/// process already has a global subscriber.
pub fn init() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("opname=info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        tracing::info!("still alive");
    }
}
