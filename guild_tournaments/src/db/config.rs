//! Database configuration.

use std::env;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Recognized variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (default: the development URL)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 2)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// Unparsable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::development();

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            log::warn!("DATABASE_URL not set, using {}", defaults.database_url);
            defaults.database_url.clone()
        });

        Self {
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: env_or("DB_CONNECTION_TIMEOUT", defaults.connection_timeout_secs),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME", defaults.max_lifetime_secs),
        }
    }

    /// Local development database
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/guild_tournaments".to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_overrides_and_fallbacks() {
        // SAFETY: serialized with every other test that touches these variables
        unsafe {
            env::set_var("DB_MAX_CONNECTIONS", "7");
            env::set_var("DB_IDLE_TIMEOUT", "not-a-number");
        }

        let config = DatabaseConfig::from_env();
        assert_eq!(config.max_connections, 7);
        assert_eq!(config.idle_timeout_secs, 600);

        unsafe {
            env::remove_var("DB_MAX_CONNECTIONS");
            env::remove_var("DB_IDLE_TIMEOUT");
        }
    }

    #[test]
    fn test_development_defaults() {
        let config = DatabaseConfig::default();
        assert!(config.min_connections <= config.max_connections);
        assert!(config.database_url.starts_with("postgres://"));
    }
}
