/// Configuration management for the API server
///
/// Loads configuration from environment variables (and a `.env` file when
/// present) into a type-safe struct.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: JWT signing secret, at least 32 characters (required)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `APP_BASE_URL`: web app URL used in invitation links
/// - `EMAIL_API_URL` / `EMAIL_API_KEY` / `EMAIL_FROM`: email transport
/// - `SSE_POLL_INTERVAL_SECS`: notification stream poll interval (default: 5)
/// - `INVITATION_TTL_HOURS`: invitation lifetime (default: 168)
///
/// # Example
///
/// ```no_run
/// use tasqar_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, time::Duration};

/// Minimum length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub notifications: NotificationConfig,
    pub invitations: InvitationConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,

    /// Public URL of the web app
    pub app_base_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig").field("secret", &"<redacted>").finish()
    }
}

/// Outgoing email configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Provider endpoint receiving JSON messages
    pub api_url: String,

    /// Provider API key; `None` logs emails instead of sending them
    pub api_key: Option<String>,

    /// Sender address
    pub from: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .finish()
    }
}

/// Notification stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Seconds between database polls on an open SSE stream
    pub poll_interval_secs: u64,
}

impl NotificationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Invitation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationConfig {
    /// Hours an invitation link stays valid
    pub ttl_hours: i64,
}

/// Reads `name`, falling back to `default` when unset
fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Reads and parses `name`, falling back to `default` when unset
fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(name, default)
        .parse::<T>()
        .with_context(|| format!("{name} has an invalid value"))
}

/// Splits a comma-separated origin list, dropping blanks
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a numeric
    /// variable doesn't parse, or `JWT_SECRET` is too short.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} characters long");
        }

        let api_key = env::var("EMAIL_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port: parse_var("API_PORT", "8080")?,
                cors_origins: parse_origins(&var_or("CORS_ORIGINS", "*")),
                production: parse_var("PRODUCTION", "false")?,
                app_base_url: var_or("APP_BASE_URL", "http://localhost:3000"),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            email: EmailConfig {
                api_url: var_or("EMAIL_API_URL", "https://api.resend.com/emails"),
                api_key,
                from: var_or("EMAIL_FROM", "Tasqar <noreply@tasqar.app>"),
            },
            notifications: NotificationConfig {
                poll_interval_secs: parse_var("SSE_POLL_INTERVAL_SECS", "5")?,
            },
            invitations: InvitationConfig {
                ttl_hours: parse_var("INVITATION_TTL_HOURS", "168")?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS should accept any origin
    pub fn cors_is_permissive(&self) -> bool {
        self.api.cors_origins.is_empty() || self.api.cors_origins.iter().any(|o| o == "*")
    }

    /// Builds a configuration for tests and local tooling
    pub fn for_testing(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
                app_base_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
            },
            email: EmailConfig {
                api_url: "http://localhost:0/emails".to_string(),
                api_key: None,
                from: "Tasqar <noreply@tasqar.app>".to_string(),
            },
            notifications: NotificationConfig {
                poll_interval_secs: 5,
            },
            invitations: InvitationConfig { ttl_hours: 168 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::for_testing(
            "postgresql://localhost/test",
            "test-secret-key-at-least-32-bytes-long",
        )
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://a.example, https://b.example,,"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_cors_is_permissive() {
        let mut config = config();
        assert!(config.cors_is_permissive());

        config.api.cors_origins = vec!["https://app.tasqar.app".to_string()];
        assert!(!config.cors_is_permissive());
    }

    #[test]
    fn test_poll_interval_is_at_least_one_second() {
        let config = NotificationConfig {
            poll_interval_secs: 0,
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = config();
        config.email.api_key = Some("re_live_key".to_string());

        let debug = format!("{config:?}");
        assert!(!debug.contains("test-secret-key"));
        assert!(!debug.contains("re_live_key"));
    }
}
