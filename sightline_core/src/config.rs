use std::time::Duration;

/// Connection settings for the Postgres-backed store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl StoreConfig {
    /// Read the Postgres store configuration from the environment.
    ///
    /// Returns `None` when `SIGHTLINE_DATABASE_URL` is unset, in which case
    /// the caller falls back to the local SQLite dev backend.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SIGHTLINE_DATABASE_URL").ok()?;
        let max_connections = std::env::var("SIGHTLINE_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let min_connections = std::env::var("SIGHTLINE_DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);
        let acquire_timeout_ms = std::env::var("SIGHTLINE_DB_ACQUIRE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5_000);

        Some(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout: Duration::from_millis(acquire_timeout_ms),
        })
    }
}

/// Settings for the reporting engine.
#[derive(Debug, Clone, Copy)]
pub struct ReportingConfig {
    /// Trailing window, in whole calendar days, over which dashboard and
    /// chart aggregates are computed.
    pub window_days: u32,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self { window_days: 30 }
    }
}

impl ReportingConfig {
    pub fn from_env() -> Self {
        let window_days = std::env::var("SIGHTLINE_WINDOW_DAYS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|d| *d > 0)
            .unwrap_or(30);
        Self { window_days }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporting_defaults_to_thirty_days() {
        assert_eq!(ReportingConfig::default().window_days, 30);
    }
}
