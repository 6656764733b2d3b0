use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Geocoding provider
    pub geocoder_base_url: String,
    pub geocoder_user_agent: String,
    pub geocoder_delay_ms: u64,

    // Event stream provider
    pub activity_base_url: String,
    pub activity_lookback_days: i64,

    // Entity/property provider
    pub entity_base_url: String,

    // Per external call
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            neo4j_uri: required_env("NEO4J_URI"),
            neo4j_user: required_env("NEO4J_USER"),
            neo4j_password: required_env("NEO4J_PASSWORD"),
            geocoder_base_url: env::var("GEOCODER_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| "weft/0.1".to_string()),
            geocoder_delay_ms: parsed_env("GEOCODER_DELAY_MS", 1000),
            activity_base_url: required_env("ACTIVITY_BASE_URL"),
            activity_lookback_days: parsed_env("ACTIVITY_LOOKBACK_DAYS", 30),
            entity_base_url: required_env("ENTITY_BASE_URL"),
            request_timeout_secs: parsed_env("REQUEST_TIMEOUT_SECS", 10),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn geocoder_delay(&self) -> Duration {
        Duration::from_millis(self.geocoder_delay_ms)
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
