//! Environment-style configuration with operational defaults.

/// Runtime configuration for the engine and its external collaborators.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path.
    pub db_path: String,
    /// Base URL of the emergency-notification collaborator.
    pub notification_url: String,
    /// Base URL of the dashboard-update collaborator.
    pub dashboard_url: String,
    /// Path to the emergency-services directory file (JSON).
    pub directory_path: String,
    /// Trailing window of unprocessed reports fetched per batch run, in hours.
    pub window_hours: i64,
    /// Interval between batch runs in serve mode, in seconds.
    pub interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "data/crisiswatch.db".to_string(),
            notification_url: "http://notification-service:5003".to_string(),
            dashboard_url: "http://dashboard-service:5004".to_string(),
            directory_path: "data/emergency_services.json".to_string(),
            window_hours: 24,
            interval_secs: 300,
        }
    }
}

impl Config {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset. Invalid numeric overrides are ignored
    /// with a warning rather than failing startup.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Self {
            db_path: env_or("CRISISWATCH_DB", defaults.db_path),
            notification_url: env_or("NOTIFICATION_SERVICE_URL", defaults.notification_url),
            dashboard_url: env_or("DASHBOARD_SERVICE_URL", defaults.dashboard_url),
            directory_path: env_or("EMERGENCY_SERVICES_FILE", defaults.directory_path),
            window_hours: env_parsed("CRISISWATCH_WINDOW_HOURS", defaults.window_hours),
            interval_secs: env_parsed("CRISISWATCH_INTERVAL_SECS", defaults.interval_secs),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(%key, %raw, "Invalid numeric override, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.window_hours, 24);
        assert_eq!(config.interval_secs, 300);
        assert!(config.notification_url.contains("notification-service"));
    }
}
