use crate::ParameterDefinition;
use std::time::Duration;

/// Configuration for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long `wait_for_hubs` blocks before giving up; `None` waits forever
    pub hub_wait_timeout: Option<Duration>,
    /// How long `wait_for_spawn` blocks before giving up; `None` waits forever
    pub spawn_timeout: Option<Duration>,
    /// Simulated round trip between a spawn request and the module coming up
    pub spawn_latency: Duration,
    pub event_buffer_size: usize,
    /// Parameters of the session pseudo-module
    pub session_parameters: Vec<ParameterDefinition>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hub_wait_timeout: None,
            spawn_timeout: None,
            spawn_latency: Duration::ZERO,
            event_buffer_size: 1000,
            session_parameters: vec![
                ParameterDefinition::new("archive_compression", 0i64, "compression for saved data"),
                ParameterDefinition::new("working_directory", "", "directory for relative paths"),
            ],
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `HUBFLOW_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env_millis("HUBFLOW_HUB_WAIT_TIMEOUT_MS") {
            config.hub_wait_timeout = Some(ms);
        }
        if let Some(ms) = env_millis("HUBFLOW_SPAWN_TIMEOUT_MS") {
            config.spawn_timeout = Some(ms);
        }
        if let Some(ms) = env_millis("HUBFLOW_SPAWN_LATENCY_MS") {
            config.spawn_latency = ms;
        }
        if let Some(size) = std::env::var("HUBFLOW_EVENT_BUFFER")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.event_buffer_size = size;
        }
        config
    }

    pub fn with_hub_wait_timeout(mut self, timeout: Duration) -> Self {
        self.hub_wait_timeout = Some(timeout);
        self
    }

    pub fn with_spawn_latency(mut self, latency: Duration) -> Self {
        self.spawn_latency = latency;
        self
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}
