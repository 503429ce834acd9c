//! Application configuration
//!
//! All settings are resolved once at startup: CLI flags take precedence over
//! environment variables, which take precedence over built-in defaults.

use anyhow::{Result, bail};
use rand::RngCore;
use rand::rngs::OsRng;

use super::cli::{CliConfig, LogFormat};
use super::constants::{
    DEFAULT_BODY_LIMIT, DEFAULT_DATABASE_URL, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_RATE_LIMIT_AUTH_RPM, DEFAULT_TOKEN_EXPIRATION_HOURS, DEFAULT_WORKER_COUNT,
    ENV_API_KEY_SECRET, ENV_DATABASE_URL, ENV_FRONTEND_URL, ENV_HOST, ENV_JWT_SECRET,
    ENV_MAX_BODY_BYTES, ENV_OAUTH_CLIENT_ID, ENV_OAUTH_CLIENT_SECRET, ENV_PORT,
    ENV_QUEUE_CAPACITY, ENV_RATE_LIMIT_AUTH_RPM, ENV_TOKEN_EXPIRATION_HOURS, ENV_WORKERS,
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Frontend origin allowed by CORS; None allows same-origin only
    pub frontend_url: Option<String>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing key for dashboard session tokens
    pub jwt_secret: Vec<u8>,
    /// HMAC key for API key hashing; defaults to the JWT secret
    pub api_key_secret: Vec<u8>,
    pub token_expiration_hours: u64,
    /// OAuth credentials are accepted and held for the dashboard's
    /// callback handler; the flow itself lives outside this crate.
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    pub rate_limit_auth_rpm: u32,
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub ingest: IngestConfig,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Resolve configuration from CLI flags and environment
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let host = cli
            .host
            .clone()
            .or_else(|| env_string(ENV_HOST))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match cli.port.or(env_parsed(ENV_PORT)?) {
            Some(p) => p,
            None => DEFAULT_PORT,
        };

        let database_url = cli
            .database_url
            .clone()
            .or_else(|| env_string(ENV_DATABASE_URL))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let jwt_secret = match env_string(ENV_JWT_SECRET) {
            Some(s) if s.len() >= 32 => s.into_bytes(),
            Some(_) => bail!("{} must be at least 32 characters", ENV_JWT_SECRET),
            None => {
                tracing::warn!(
                    "{} not set; generating an ephemeral secret. \
                     Sessions will not survive a restart.",
                    ENV_JWT_SECRET
                );
                let mut buf = [0u8; 32];
                OsRng.fill_bytes(&mut buf);
                buf.to_vec()
            }
        };

        let api_key_secret = env_string(ENV_API_KEY_SECRET)
            .map(String::into_bytes)
            .unwrap_or_else(|| jwt_secret.clone());

        let workers = cli
            .workers
            .or(env_parsed(ENV_WORKERS)?)
            .unwrap_or(DEFAULT_WORKER_COUNT)
            .max(1);

        let queue_capacity = cli
            .queue_capacity
            .or(env_parsed(ENV_QUEUE_CAPACITY)?)
            .unwrap_or(DEFAULT_QUEUE_CAPACITY)
            .max(1);

        let max_body_bytes = cli
            .max_body_bytes
            .or(env_parsed(ENV_MAX_BODY_BYTES)?)
            .unwrap_or(DEFAULT_BODY_LIMIT);

        let token_expiration_hours = env_parsed(ENV_TOKEN_EXPIRATION_HOURS)?
            .unwrap_or(DEFAULT_TOKEN_EXPIRATION_HOURS);

        let rate_limit_auth_rpm = cli
            .rate_limit_auth_rpm
            .or(env_parsed(ENV_RATE_LIMIT_AUTH_RPM)?)
            .unwrap_or(DEFAULT_RATE_LIMIT_AUTH_RPM);

        Ok(Self {
            server: ServerConfig {
                host,
                port,
                frontend_url: cli
                    .frontend_url
                    .clone()
                    .or_else(|| env_string(ENV_FRONTEND_URL)),
                max_body_bytes,
            },
            database: DatabaseConfig { url: database_url },
            auth: AuthConfig {
                jwt_secret,
                api_key_secret,
                token_expiration_hours,
                oauth_client_id: env_string(ENV_OAUTH_CLIENT_ID),
                oauth_client_secret: env_string(ENV_OAUTH_CLIENT_SECRET),
                rate_limit_auth_rpm,
            },
            ingest: IngestConfig {
                workers,
                queue_capacity,
            },
            log_format: cli.log_format.unwrap_or_default(),
        })
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(s) => match s.parse() {
            Ok(v) => Ok(Some(v)),
            Err(e) => bail!("Invalid value for {}: {}", name, e),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // CLI overrides pin every value the environment could perturb
        let cli = CliConfig {
            host: Some("0.0.0.0".into()),
            port: Some(9000),
            database_url: Some("sqlite::memory:".into()),
            workers: Some(2),
            queue_capacity: Some(10),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.ingest.workers, 2);
        assert_eq!(config.ingest.queue_capacity, 10);
        assert_eq!(config.auth.jwt_secret.len(), 32);
        // API key secret falls back to the JWT secret
        assert_eq!(config.auth.api_key_secret, config.auth.jwt_secret);
    }

    #[test]
    fn test_worker_count_floor() {
        let cli = CliConfig {
            workers: Some(0),
            queue_capacity: Some(0),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.ingest.workers, 1);
        assert_eq!(config.ingest.queue_capacity, 1);
    }
}
