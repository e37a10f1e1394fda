/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated origins for the account endpoints (default: *)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `STRIPE_WEBHOOK_SECRET`: Signing secret of the webhook endpoint (required)
/// - `STRIPE_WEBHOOK_TOLERANCE_SECS`: Accepted signature age (default: 300)
/// - `SESSION_JWT_SECRET`: Identity provider JWT secret (required)
/// - `RUST_LOG`: Log level (default: debug for this crate)
///
/// # Example
///
/// ```no_run
/// use mastery_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use mastery_shared::payments::stripe::DEFAULT_TOLERANCE_SECS;
use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub stripe: StripeConfig,

    pub session: SessionConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed origins for the account endpoints; `*` allows any.
    /// The webhook endpoint always allows any origin.
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

/// Stripe webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    /// Endpoint signing secret (`whsec_...`)
    pub webhook_secret: String,

    /// Maximum age of a signature timestamp, in seconds
    pub tolerance_secs: i64,
}

/// Identity provider session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HS256 secret the provider signs session tokens with
    pub jwt_secret: String,
}

impl Config {
    /// Loads configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = lookup("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let webhook_secret = lookup("STRIPE_WEBHOOK_SECRET")
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("STRIPE_WEBHOOK_SECRET environment variable is required"))?;

        let tolerance_secs = match lookup("STRIPE_WEBHOOK_TOLERANCE_SECS") {
            Some(raw) => raw.parse::<i64>()?,
            None => DEFAULT_TOLERANCE_SECS,
        };

        if tolerance_secs <= 0 {
            anyhow::bail!("STRIPE_WEBHOOK_TOLERANCE_SECS must be positive");
        }

        let jwt_secret = lookup("SESSION_JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("SESSION_JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("SESSION_JWT_SECRET must be at least 32 characters long");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            stripe: StripeConfig {
                webhook_secret,
                tolerance_secs,
            },
            session: SessionConfig { jwt_secret },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether the account endpoints accept any origin
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgresql://localhost/mastery"),
        ("STRIPE_WEBHOOK_SECRET", "whsec_test"),
        ("SESSION_JWT_SECRET", "0123456789abcdef0123456789abcdef"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.stripe.tolerance_secs, 300);
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_cors_origins_are_split() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push((
            "CORS_ORIGINS",
            "https://medicaremastery.app, https://app.medicaremastery.app",
        ));

        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(
            config.api.cors_origins,
            vec![
                "https://medicaremastery.app".to_string(),
                "https://app.medicaremastery.app".to_string()
            ]
        );
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_missing_webhook_secret_fails() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "STRIPE_WEBHOOK_SECRET")
            .collect();

        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("STRIPE_WEBHOOK_SECRET"));
    }

    #[test]
    fn test_short_session_secret_fails() {
        let mut pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "SESSION_JWT_SECRET")
            .collect();
        pairs.push(("SESSION_JWT_SECRET", "short"));

        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
