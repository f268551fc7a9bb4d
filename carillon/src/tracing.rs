//! Tracing setup and the macro prelude used throughout the crate.

/// Re-exports of the tracing macros for `use crate::tracing::prelude::*;`.
pub mod prelude {
    pub use ::tracing::{debug, error, info, trace, warn};
}

/// Install the global subscriber: fmt output filtered by `RUST_LOG`
/// (default `info`).
pub fn init() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
