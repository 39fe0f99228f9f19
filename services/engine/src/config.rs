//! Process configuration
//!
//! Every setting comes from a flag or its environment variable. The parsed
//! [`Cli`] is turned into a [`Config`] once at startup and passed down.

use anyhow::{bail, Result};
use clap::Parser;
use cloudflare_dns::cloudflare::CLOUDFLARE_API_BASE;
use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::{AuthPolicy, DEFAULT_TOKEN_TTL_DAYS};
use crate::records::DEFAULT_FREE_RECORD_LIMIT;
use crate::store::DatabaseConfig;

#[derive(Parser, Debug)]
#[command(name = "engine", author, version, about = "DDNS.LAND subdomain service", long_about = None)]
pub struct Cli {
    /// Listen address
    #[arg(long, env = "ENGINE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Parent domain users claim labels under
    #[arg(long, env = "DDNS_DOMAIN", default_value = "ddns.land")]
    pub domain: String,

    /// Cloudflare API token
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub cloudflare_api_token: String,

    /// Cloudflare zone ID for the parent domain
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    pub cloudflare_zone_id: String,

    #[arg(long, env = "CLOUDFLARE_API_BASE", default_value = CLOUDFLARE_API_BASE)]
    pub cloudflare_api_base: String,

    /// Provider request timeout in seconds
    #[arg(long, env = "CLOUDFLARE_TIMEOUT_SECS", default_value = "30")]
    pub cloudflare_timeout_secs: u64,

    /// SurrealDB endpoint (ws://, wss://, http(s):// or mem://)
    #[arg(long, env = "DB_URL", default_value = "ws://127.0.0.1:8000")]
    pub db_url: String,

    #[arg(long, env = "DB_NAMESPACE", default_value = "ddns")]
    pub db_namespace: String,

    #[arg(long, env = "DB_NAME", default_value = "engine")]
    pub db_name: String,

    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    pub db_pass: Option<String>,

    /// HS256 signing secret for session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Session lifetime in days
    #[arg(long, env = "JWT_EXPIRY_DAYS", default_value_t = DEFAULT_TOKEN_TTL_DAYS)]
    pub jwt_expiry_days: i64,

    /// Record ceiling for free accounts
    #[arg(long, env = "FREE_RECORD_LIMIT", default_value_t = DEFAULT_FREE_RECORD_LIMIT)]
    pub free_record_limit: usize,

    /// Email domains accepted at registration; empty accepts any
    #[arg(long, env = "ALLOWED_EMAIL_DOMAINS", value_delimiter = ',', default_value = "gmail.com")]
    pub allowed_email_domains: Vec<String>,

    /// Emails that register with the admin role
    #[arg(long, env = "ADMIN_EMAILS", value_delimiter = ',')]
    pub admin_emails: Vec<String>,

    /// Allowed CORS origins; `*` allows any
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct CloudflareSettings {
    pub api_token: String,
    pub zone_id: String,
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub domain: String,
    pub cloudflare: CloudflareSettings,
    pub database: DatabaseConfig,
    pub jwt_secret: String,
    pub token_lifetime: chrono::Duration,
    pub free_record_limit: usize,
    pub auth_policy: AuthPolicy,
    pub cors_origins: Vec<String>,
    pub log_json: bool,
    pub verbose: bool,
}

/// Trim, lower-case and drop empty entries
fn normalize_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let domain = cli.domain.trim().trim_matches('.').to_lowercase();
        if domain.is_empty() {
            bail!("DDNS_DOMAIN must not be empty");
        }
        if cli.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        if cli.jwt_expiry_days <= 0 {
            bail!("JWT_EXPIRY_DAYS must be positive");
        }

        Ok(Config {
            bind: cli.bind,
            domain,
            cloudflare: CloudflareSettings {
                api_token: cli.cloudflare_api_token,
                zone_id: cli.cloudflare_zone_id,
                api_base: cli.cloudflare_api_base,
                timeout: Duration::from_secs(cli.cloudflare_timeout_secs),
            },
            database: DatabaseConfig {
                url: cli.db_url,
                namespace: cli.db_namespace,
                database: cli.db_name,
                username: cli.db_user,
                password: cli.db_pass,
            },
            jwt_secret: cli.jwt_secret,
            token_lifetime: chrono::Duration::days(cli.jwt_expiry_days),
            free_record_limit: cli.free_record_limit,
            auth_policy: AuthPolicy {
                allowed_email_domains: normalize_list(cli.allowed_email_domains),
                admin_emails: normalize_list(cli.admin_emails),
            },
            cors_origins: cli
                .cors_origins
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            log_json: cli.log_json,
            verbose: cli.verbose,
        })
    }
}
