//! DDNS.LAND Engine
//!
//! Serves the subdomain API. Records are mirrored at Cloudflare and persisted
//! in SurrealDB.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cloudflare_dns::{CloudflareClient, CloudflareConfig};
use ddns_engine::auth::TokenIssuer;
use ddns_engine::http::{self, AppState};
use ddns_engine::records::QuotaPolicy;
use ddns_engine::{AdminService, AuthService, Cli, Config, RecordManager, SurrealStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::try_from(Cli::parse())?;

    let level = if config.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let builder = FmtSubscriber::builder().with_env_filter(filter);
    if config.log_json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }

    info!(domain = %config.domain, "Starting DDNS.LAND engine");

    let provider = CloudflareClient::new(
        CloudflareConfig::new(
            config.cloudflare.api_token.clone(),
            config.cloudflare.zone_id.clone(),
        )
        .with_base_url(config.cloudflare.api_base.clone())
        .with_timeout(config.cloudflare.timeout),
    )?;

    let store = Arc::new(
        SurrealStore::connect(&config.database)
            .await
            .with_context(|| format!("Failed to connect to {}", config.database.url))?,
    );

    let records = Arc::new(RecordManager::new(
        Arc::new(provider),
        store.clone(),
        QuotaPolicy::new(config.free_record_limit),
        config.domain.clone(),
    ));
    let auth = Arc::new(AuthService::new(
        store.clone(),
        TokenIssuer::new(&config.jwt_secret, config.token_lifetime),
        config.auth_policy.clone(),
    ));
    let admin = Arc::new(AdminService::new(store, records.clone()));

    let state = AppState {
        auth,
        records,
        admin,
    };
    let app = http::router(state, http::cors_layer(&config.cors_origins)?);

    info!("Engine listening on {}", config.bind);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}
