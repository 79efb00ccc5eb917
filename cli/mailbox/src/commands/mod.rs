//! CLI commands.

mod campaign;
mod report;
mod users;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mailbox_tracker::db::{Database, DbConfig};
use mailbox_tracker::store::Store;
use tracing::debug;

use crate::error::CliError;
use crate::output::OutputFormat;

/// mailbox - Issue campaigns, mint tracking links, and report on opens.
#[derive(Debug, Parser)]
#[command(name = "mailbox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Campaign database URL.
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Deadline for each database call, in milliseconds.
    #[arg(
        long,
        global = true,
        env = "MAILBOX_STORE_TIMEOUT_MS",
        default_value = "5000"
    )]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create, list, and sign campaigns.
    Campaign(campaign::CampaignCommand),

    /// Open reports for a campaign and recipient group.
    Report(report::ReportCommand),

    /// Inspect recipients.
    Users(users::UsersCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let mut database = DbConfig::from_env();
        if let Some(url) = self.database_url {
            database.database_url = url;
        }

        let ctx = CommandContext {
            format: OutputFormat::parse(&self.format),
            database,
            timeout: Duration::from_millis(self.timeout_ms),
        };

        match self.command {
            Commands::Campaign(cmd) => cmd.run(ctx).await,
            Commands::Report(cmd) => cmd.run(ctx).await,
            Commands::Users(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("mailbox {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub format: OutputFormat,
    pub database: DbConfig,
    /// Deadline applied to every store call.
    pub timeout: Duration,
}

impl CommandContext {
    /// Connect to the campaign database.
    pub async fn store(&self) -> Result<Arc<dyn Store>> {
        debug!(
            max_connections = self.database.max_connections,
            "Connecting to campaign database"
        );
        let db = Database::connect(&self.database)
            .await
            .map_err(CliError::Database)?;
        Ok(Arc::new(db.store()))
    }
}
