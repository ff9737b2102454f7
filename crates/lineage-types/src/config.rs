use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Timeout applied to every single backend fetch
    pub fetch_timeout: Duration,
    /// Capacity of the event channel between the run and its consumer
    pub channel_capacity: usize,
    /// Emit a progress event for every expanded node
    pub emit_progress: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            channel_capacity: 1000,
            emit_progress: true,
        }
    }
}

impl TraversalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.emit_progress = enabled;
        self
    }
}
