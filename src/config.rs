/// Configuration management
///
/// All settings come from environment variables with development defaults.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Cache (Redis) configuration
    pub cache: CacheConfig,
    /// Media (uploaded image) storage configuration
    pub media: MediaConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Cache (Redis) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL
    pub url: String,
    /// TTL of the cached home-page response, in seconds
    pub index_ttl_secs: u64,
}

/// Media storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory uploaded images are stored under
    pub root: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) if app_env.eq_ignore_ascii_case("production") => {
                return Err("DATABASE_URL must be set in production".to_string())
            }
            Err(_) => "postgresql://localhost/quill".to_string(),
        };

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("QUILL_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("QUILL_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            cache: CacheConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                index_ttl_secs: std::env::var("INDEX_CACHE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            },
            media: MediaConfig {
                root: std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        // Other tests do not touch these variables.
        let config = Config::from_env().expect("default config loads");
        assert_eq!(config.cache.index_ttl_secs, 20);
        assert_eq!(config.app.port, 8000);
        assert_eq!(config.media.root, "media");
    }
}
