//! Cloudflare DNS Operator CLI
//!
//! Talks to the provider directly, bypassing the engine and its record store.
//! Used to inspect provider state and repair drift after the engine reports a
//! consistency error.
//!
//! # Usage
//! ```bash
//! # List records (optionally one name)
//! cloudflare-dns list --name host1.ddns.land
//!
//! # Create A record
//! cloudflare-dns create --name host1.ddns.land --type A --content 1.2.3.4
//!
//! # Delete an orphaned record
//! cloudflare-dns delete --record-id abc123
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cloudflare_dns::{CloudflareClient, CloudflareConfig, DnsProvider, DnsRecordRequest, RecordType};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser)]
#[command(name = "cloudflare-dns")]
#[command(about = "DDNS.LAND Cloudflare DNS operator tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Cloudflare API token
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: String,

    /// Cloudflare zone ID
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    zone_id: String,

    /// Cloudflare API base URL
    #[arg(long, env = "CLOUDFLARE_API_BASE", default_value = cloudflare_dns::cloudflare::CLOUDFLARE_API_BASE)]
    api_base: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List DNS records in the zone
    List {
        /// Only show records with this fully-qualified name
        #[arg(long)]
        name: Option<String>,
    },

    /// Create a new DNS record
    Create {
        /// Fully-qualified record name (e.g., host1.ddns.land)
        #[arg(long)]
        name: String,

        /// Record type (A, AAAA, CNAME)
        #[arg(long = "type")]
        record_type: RecordType,

        /// Record content (IP address or alias target)
        #[arg(long)]
        content: String,

        /// TTL in seconds (1 = automatic)
        #[arg(long, default_value = "1")]
        ttl: u32,

        /// Enable Cloudflare proxy
        #[arg(long)]
        proxied: bool,
    },

    /// Replace an existing DNS record
    Update {
        /// Provider record ID
        #[arg(long)]
        record_id: String,

        /// Fully-qualified record name
        #[arg(long)]
        name: String,

        /// Record type (A, AAAA, CNAME)
        #[arg(long = "type")]
        record_type: RecordType,

        /// New content
        #[arg(long)]
        content: String,

        /// TTL in seconds (1 = automatic)
        #[arg(long, default_value = "1")]
        ttl: u32,

        /// Enable Cloudflare proxy
        #[arg(long)]
        proxied: bool,
    },

    /// Delete a DNS record
    Delete {
        /// Provider record ID to delete
        #[arg(long)]
        record_id: String,
    },
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = CloudflareConfig::new(cli.api_token, cli.zone_id)
        .with_base_url(cli.api_base)
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    let cf = CloudflareClient::new(config)?;

    match cli.command {
        Commands::List { name } => {
            info!(zone = %cf.zone_id(), "Listing DNS records");
            let records = cf
                .list_records(name.as_deref())
                .await
                .context("Failed to list records")?;

            println!(
                "\n{:<34} {:<6} {:<32} {:<40}",
                "ID", "TYPE", "NAME", "CONTENT"
            );
            println!("{}", "-".repeat(112));

            for record in &records {
                println!(
                    "{:<34} {:<6} {:<32} {:<40}",
                    record.id,
                    record.record_type,
                    truncate(&record.name, 32),
                    truncate(&record.content, 40)
                );
            }

            info!("Listed {} records", records.len());
        }

        Commands::Create {
            name,
            record_type,
            content,
            ttl,
            proxied,
        } => {
            info!(name = %name, content = %content, "Creating DNS record");

            let request = DnsRecordRequest {
                record_type,
                name,
                content,
                ttl,
                proxied,
            };
            let record = cf.create_record(&request).await?;

            println!("Created record: {}", record.id);
        }

        Commands::Update {
            record_id,
            name,
            record_type,
            content,
            ttl,
            proxied,
        } => {
            info!(record_id = %record_id, content = %content, "Updating DNS record");

            let request = DnsRecordRequest {
                record_type,
                name,
                content,
                ttl,
                proxied,
            };
            cf.update_record(&record_id, &request).await?;

            println!("Updated record: {}", record_id);
        }

        Commands::Delete { record_id } => {
            warn!(record_id = %record_id, "Deleting DNS record");

            cf.delete_record(&record_id).await?;

            println!("Deleted record: {}", record_id);
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}
