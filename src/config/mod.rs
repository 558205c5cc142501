use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub reference_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub secure_cookies: bool,
    pub cors_origins: Vec<String>,
}

/// Fixed-window limits for the login paths. Advisory protection only; state
/// is process-local and resets on restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_secs: u64,
    pub failed_login_reports: u32,
    pub failed_login_window_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout_secs =
                v.parse().unwrap_or(self.database.connection_timeout_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_REFERENCE_CACHE_TTL_SECS") {
            self.api.reference_cache_ttl_secs =
                v.parse().unwrap_or(self.api.reference_cache_ttl_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Rate limit overrides
        if let Ok(v) = env::var("RATE_LIMIT_LOGIN_ATTEMPTS") {
            self.rate_limit.login_attempts = v.parse().unwrap_or(self.rate_limit.login_attempts);
        }
        if let Ok(v) = env::var("RATE_LIMIT_LOGIN_WINDOW_SECS") {
            self.rate_limit.login_window_secs =
                v.parse().unwrap_or(self.rate_limit.login_window_secs);
        }
        if let Ok(v) = env::var("RATE_LIMIT_FAILED_LOGIN_REPORTS") {
            self.rate_limit.failed_login_reports =
                v.parse().unwrap_or(self.rate_limit.failed_login_reports);
        }
        if let Ok(v) = env::var("RATE_LIMIT_FAILED_LOGIN_WINDOW_SECS") {
            self.rate_limit.failed_login_window_secs =
                v.parse().unwrap_or(self.rate_limit.failed_login_window_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            api: ApiConfig {
                default_page_size: 20,
                max_page_size: 100,
                reference_cache_ttl_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7,
                secure_cookies: false,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            rate_limit: RateLimitConfig {
                login_attempts: 10,
                login_window_secs: 60,
                failed_login_reports: 20,
                failed_login_window_secs: 300,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout_secs: 10,
            },
            api: ApiConfig {
                default_page_size: 20,
                max_page_size: 100,
                reference_cache_ttl_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                secure_cookies: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            rate_limit: RateLimitConfig {
                login_attempts: 10,
                login_window_secs: 60,
                failed_login_reports: 20,
                failed_login_window_secs: 300,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout_secs: 5,
            },
            api: ApiConfig {
                default_page_size: 20,
                max_page_size: 100,
                reference_cache_ttl_secs: 60,
            },
            security: SecurityConfig {
                // Must come from JWT_SECRET in production; empty secret fails
                // token generation rather than silently signing with a default.
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                secure_cookies: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            rate_limit: RateLimitConfig {
                login_attempts: 10,
                login_window_secs: 60,
                failed_login_reports: 20,
                failed_login_window_secs: 300,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.api.max_page_size, 100);
        assert!(!config.security.secure_cookies);
        assert_eq!(config.rate_limit.login_attempts, 10);
        assert_eq!(config.rate_limit.login_window_secs, 60);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.security.secure_cookies);
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.rate_limit.failed_login_reports, 20);
        assert_eq!(config.rate_limit.failed_login_window_secs, 300);
    }
}
