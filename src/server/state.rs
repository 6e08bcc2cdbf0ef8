//! Application state

use super::ServerConfig;

/// Read-only state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            started_at: chrono::Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }
}
