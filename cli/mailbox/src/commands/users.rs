//! Recipient commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use mailbox_tracker::store::{with_deadline, Recipient};
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use crate::error::CliError;
use crate::output::print_output;

use super::CommandContext;

/// Recipient commands.
#[derive(Debug, Args)]
pub struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Debug, Subcommand)]
enum UsersSubcommand {
    /// Show the recipients of one or more groups.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Recipient groups.
    #[arg(required = true)]
    groups: Vec<String>,
}

impl UsersCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            UsersSubcommand::Show(args) => show_users(ctx, args).await,
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
struct UserRow {
    id: String,
    email: String,
    group: String,
    fname: String,
    lname: String,
}

impl From<Recipient> for UserRow {
    fn from(r: Recipient) -> Self {
        Self {
            id: r.id.to_string(),
            email: r.email,
            group: r.group,
            fname: r.first_name,
            lname: r.last_name,
        }
    }
}

async fn show_users(ctx: CommandContext, args: ShowArgs) -> Result<()> {
    let store = ctx.store().await?;

    let mut rows = Vec::new();
    for group in &args.groups {
        let recipients = with_deadline(ctx.timeout, store.recipients_in_group(group))
            .await
            .map_err(CliError::from)?;
        for recipient in recipients {
            match recipient {
                Ok(r) => rows.push(UserRow::from(r)),
                Err(e) => warn!(group = %group, error = %e, "Skipping undecodable recipient row"),
            }
        }
    }

    print_output(&rows, ctx.format);
    Ok(())
}
