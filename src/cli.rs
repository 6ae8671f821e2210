use clap::{Parser, Subcommand};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapters::PostgresTransactionRepository;
use crate::config::Config;
use crate::domain::Actor;
use crate::ports::StatsFilter;
use crate::services::TransactionManager;

#[derive(Parser)]
#[command(name = "agro-market-core")]
#[command(about = "Agro Market Core - transaction lifecycle and inquiry service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction inspection commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Print a transaction as JSON
    Show {
        /// Transaction UUID
        #[arg(value_name = "TX_ID")]
        tx_id: Uuid,
    },

    /// Print aggregate statistics, optionally for one user
    Stats {
        #[arg(long)]
        user_id: Option<Uuid>,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

fn operator_manager(pool: &PgPool) -> TransactionManager {
    TransactionManager::new(Arc::new(PostgresTransactionRepository::new(pool.clone())))
}

pub async fn handle_tx_show(pool: &PgPool, tx_id: Uuid) -> anyhow::Result<()> {
    // Operator access reads any record.
    let operator = Actor::admin(Uuid::nil());
    let tx = operator_manager(pool).get(&operator, tx_id).await?;
    println!("{}", serde_json::to_string_pretty(&tx)?);
    Ok(())
}

pub async fn handle_tx_stats(pool: &PgPool, user_id: Option<Uuid>) -> anyhow::Result<()> {
    let filter = StatsFilter {
        user_id,
        ..Default::default()
    };
    let stats = operator_manager(pool).stats(&filter).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Max Connections: {}", config.database_max_connections);
    println!("  Log Format: {:?}", config.log_format);

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user_start = slash_pos + 2;
                let user = &url[user_start..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}
