use clap::{Parser, Subcommand};

use super::constants::{
    ENV_DATABASE_URL, ENV_FRONTEND_URL, ENV_HOST, ENV_LOG_FORMAT, ENV_MAX_BODY_BYTES, ENV_PORT,
    ENV_QUEUE_CAPACITY, ENV_RATE_LIMIT_AUTH_RPM, ENV_WORKERS,
};

#[derive(Parser)]
#[command(name = "lumetrace")]
#[command(version, about = "Self-hosted LLM observability backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Database URL (sqlite path or sqlite::memory:)
    #[arg(long, global = true, env = ENV_DATABASE_URL)]
    pub database_url: Option<String>,

    /// Log output format (compact or json)
    #[arg(long, global = true, env = ENV_LOG_FORMAT, value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,

    /// Frontend origin allowed by CORS
    #[arg(long, global = true, env = ENV_FRONTEND_URL)]
    pub frontend_url: Option<String>,

    /// Ingestion worker count
    #[arg(long, global = true, env = ENV_WORKERS)]
    pub workers: Option<usize>,

    /// Ingestion queue capacity (jobs)
    #[arg(long, global = true, env = ENV_QUEUE_CAPACITY)]
    pub queue_capacity: Option<usize>,

    /// Maximum request body size in bytes
    #[arg(long, global = true, env = ENV_MAX_BODY_BYTES)]
    pub max_body_bytes: Option<usize>,

    /// Auth endpoint rate limit (requests per minute per IP, 0 disables)
    #[arg(long, global = true, env = ENV_RATE_LIMIT_AUTH_RPM)]
    pub rate_limit_auth_rpm: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Parse log format from CLI/env string
fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    match s.to_lowercase().as_str() {
        "compact" | "text" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        _ => Err(format!(
            "Invalid log format '{}'. Valid options: compact, json",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub log_format: Option<LogFormat>,
    pub frontend_url: Option<String>,
    pub workers: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub max_body_bytes: Option<usize>,
    pub rate_limit_auth_rpm: Option<u32>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        database_url: cli.database_url,
        log_format: cli.log_format,
        frontend_url: cli.frontend_url,
        workers: cli.workers,
        queue_capacity: cli.queue_capacity,
        max_body_bytes: cli.max_body_bytes,
        rate_limit_auth_rpm: cli.rate_limit_auth_rpm,
    };
    (config, cli.command)
}
