use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub query_timeout_ms: u64,
}

#[derive(Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub jwt_extended_expiry_hours: u64,
}

// Hand-written so the secret never ends up in logs.
impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("jwt_extended_expiry_hours", &self.jwt_extended_expiry_hours)
            .finish()
    }
}

#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: String,
    pub frontend_url: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("from_address", &self.from_address)
            .field("frontend_url", &self.frontend_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub default_limit: i64,
    pub max_limit: Option<i64>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: crate::filter::DEFAULT_LIMIT,
            max_limit: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("{0} must be between 1 and {max} hours", max = MAX_TOKEN_HOURS)]
    TokenLifetime(&'static str),
}

/// Longest session lifetime accepted from configuration (ten years).
pub const MAX_TOKEN_HOURS: u64 = 24 * 365 * 10;

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. `from_env` is
    /// this with the process environment plugged in.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Server overrides
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("APP_PORT").or_else(|| lookup("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }
        if let Some(v) = lookup("CORS_ORIGIN") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Some(v) = lookup("DATABASE_QUERY_TIMEOUT_MS") {
            self.database.query_timeout_ms = v.parse().unwrap_or(self.database.query_timeout_ms);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Some(v) = lookup("JWT_EXTENDED_EXPIRY_HOURS") {
            self.security.jwt_extended_expiry_hours =
                v.parse().unwrap_or(self.security.jwt_extended_expiry_hours);
        }

        // Mail overrides
        if let Some(v) = lookup("SMTP_HOST") {
            self.mail.smtp_host = Some(v);
        }
        if let Some(v) = lookup("SMTP_PORT") {
            self.mail.smtp_port = v.parse().unwrap_or(self.mail.smtp_port);
        }
        if let Some(v) = lookup("SMTP_EMAIL") {
            self.mail.smtp_user = Some(v);
        }
        if let Some(v) = lookup("SMTP_PASSWORD") {
            self.mail.smtp_password = Some(v);
        }
        if let Some(v) = lookup("MAIL_FROM") {
            self.mail.from_address = v;
        }
        if let Some(v) = lookup("FRONTEND_URL") {
            self.mail.frontend_url = v.trim_end_matches('/').to_string();
        }

        // Query overrides
        if let Some(v) = lookup("QUERY_DEFAULT_LIMIT") {
            self.query.default_limit = v
                .parse()
                .ok()
                .filter(|n: &i64| *n > 0)
                .unwrap_or(self.query.default_limit);
        }
        if let Some(v) = lookup("QUERY_MAX_LIMIT") {
            self.query.max_limit = v.parse().ok().filter(|n: &i64| *n > 0);
        }

        self
    }

    /// Checks the settings the server cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.database.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        for (name, hours) in [
            ("JWT_EXPIRY_HOURS", self.security.jwt_expiry_hours),
            ("JWT_EXTENDED_EXPIRY_HOURS", self.security.jwt_extended_expiry_hours),
        ] {
            if hours == 0 || hours > MAX_TOKEN_HOURS {
                return Err(ConfigError::TokenLifetime(name));
            }
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                request_timeout_secs: 30,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                max_body_bytes: 6 * 1024 * 1024, // 6MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                acquire_timeout_secs: 30,
                query_timeout_ms: 10_000,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                jwt_extended_expiry_hours: 24 * 30,
            },
            mail: MailConfig {
                smtp_host: None,
                smtp_port: 587,
                smtp_user: None,
                smtp_password: None,
                from_address: "no-reply@localhost".to_string(),
                frontend_url: "http://localhost:5173".to_string(),
            },
            query: QueryConfig {
                default_limit: crate::filter::DEFAULT_LIMIT,
                max_limit: Some(1000),
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.request_timeout_secs = 15;
        config.server.cors_origins = vec![];
        config.database.max_connections = 20;
        config.database.acquire_timeout_secs = 10;
        config.database.query_timeout_ms = 5_000;
        config.query.max_limit = Some(500);
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.request_timeout_secs = 10;
        config.server.cors_origins = vec![];
        config.database.max_connections = 50;
        config.database.acquire_timeout_secs = 5;
        config.database.query_timeout_ms = 5_000;
        config.query.max_limit = Some(100);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.query.default_limit, 50);
        assert_eq!(config.security.jwt_expiry_hours, 24);
        assert!(!config.is_production());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::from_lookup(lookup(&[("APP_ENV", "production")]));
        assert!(config.is_production());
        assert_eq!(config.query.max_limit, Some(100));
        assert!(config.server.cors_origins.is_empty());
    }

    #[test]
    fn env_overrides_apply_on_top_of_presets() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("CORS_ORIGIN", "https://a.example, https://b.example"),
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/atlas"),
            ("FRONTEND_URL", "https://app.example/"),
            ("QUERY_DEFAULT_LIMIT", "-4"),
        ]));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.mail.frontend_url, "https://app.example");
        assert_eq!(config.query.default_limit, 50);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn validate_requires_secret_and_database() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x/y")]));
        assert_eq!(config.validate(), Err(ConfigError::Missing("JWT_SECRET")));

        let config = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "x")]));
        assert_eq!(config.validate(), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn validate_bounds_token_lifetimes() {
        let base = [("JWT_SECRET", "x"), ("DATABASE_URL", "postgres://x/y")];

        let config = AppConfig::from_lookup(lookup(&[base[0], base[1], ("JWT_EXPIRY_HOURS", "99999999999999")]));
        assert_eq!(config.validate(), Err(ConfigError::TokenLifetime("JWT_EXPIRY_HOURS")));

        let config = AppConfig::from_lookup(lookup(&[base[0], base[1], ("JWT_EXTENDED_EXPIRY_HOURS", "0")]));
        assert_eq!(config.validate(), Err(ConfigError::TokenLifetime("JWT_EXTENDED_EXPIRY_HOURS")));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "do-not-print"), ("SMTP_PASSWORD", "hunter2")]));
        let printed = format!("{:?}", config);
        assert!(!printed.contains("do-not-print"));
        assert!(!printed.contains("hunter2"));
    }
}
