//! Engine configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long each display worker sleeps between render cycles.
    pub render_interval: Duration,

    /// Byte cap on alarm messages, enforced at the submission boundary.
    pub max_message_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_interval: Duration::from_secs(5),
            max_message_bytes: 127,
        }
    }
}
