//! Campaign commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use mailbox_id::{CampaignId, RecipientId};
use mailbox_tracker::store::Campaign;
use mailbox_tracker::{KeyStore, Signer};
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_info, print_output, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Attempts before giving up on repeated campaign id collisions.
const CREATE_ATTEMPTS: u32 = 3;

const SEED_MASK: &str = "********";

/// Campaign commands.
#[derive(Debug, Args)]
pub struct CampaignCommand {
    #[command(subcommand)]
    command: CampaignSubcommand,
}

#[derive(Debug, Subcommand)]
enum CampaignSubcommand {
    /// Create a campaign with a fresh id and seed.
    Create(SeedArgs),

    /// List campaigns, most recently updated first.
    List(SeedArgs),

    /// Mint a signed tracking link for one recipient.
    Hash(HashArgs),
}

#[derive(Debug, Args)]
struct SeedArgs {
    /// Show the secret seed instead of a mask.
    #[arg(long)]
    show_seed: bool,
}

#[derive(Debug, Args)]
struct HashArgs {
    /// Campaign ID.
    #[arg(long)]
    cid: CampaignId,

    /// Recipient ID.
    #[arg(long)]
    uid: RecipientId,

    /// Prefix the link with this base URL, e.g. https://mail.example.com.
    #[arg(long)]
    base_url: Option<String>,
}

impl CampaignCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            CampaignSubcommand::Create(args) => create_campaign(ctx, args).await,
            CampaignSubcommand::List(args) => list_campaigns(ctx, args).await,
            CampaignSubcommand::Hash(args) => hash_link(ctx, args).await,
        }
    }
}

/// Campaign row.
#[derive(Debug, Clone, Serialize, Tabled)]
struct CampaignRow {
    #[tabled(rename = "id")]
    id: String,

    #[tabled(rename = "seed")]
    seed: String,

    #[tabled(rename = "created")]
    created: String,

    #[tabled(rename = "updated")]
    updated: String,
}

impl CampaignRow {
    fn from_campaign(campaign: &Campaign, show_seed: bool) -> Self {
        Self {
            id: campaign.id.to_string(),
            seed: if show_seed {
                campaign.seed.expose().to_string()
            } else {
                SEED_MASK.to_string()
            },
            created: campaign.created.to_rfc3339(),
            updated: campaign.updated.to_rfc3339(),
        }
    }
}

/// Signed link output.
#[derive(Debug, Serialize)]
struct LinkOutput {
    campaign_id: String,
    recipient_id: String,
    token: String,
    link: String,
}

async fn create_campaign(ctx: CommandContext, args: SeedArgs) -> Result<()> {
    let keys = KeyStore::new(ctx.store().await?, ctx.timeout);
    let campaign = keys
        .create_campaign_with_retry(CREATE_ATTEMPTS)
        .await
        .map_err(CliError::from)?;
    let row = CampaignRow::from_campaign(&campaign, args.show_seed);

    match ctx.format {
        OutputFormat::Json => print_single(&row),
        OutputFormat::Table => {
            print_success(&format!("Created campaign {}", row.id));
            if args.show_seed {
                print_info(&format!("Seed: {}", row.seed));
            }
        }
    }

    Ok(())
}

async fn list_campaigns(ctx: CommandContext, args: SeedArgs) -> Result<()> {
    let keys = KeyStore::new(ctx.store().await?, ctx.timeout);
    let campaigns = keys.list_campaigns().await.map_err(CliError::from)?;

    let rows: Vec<CampaignRow> = campaigns
        .iter()
        .map(|c| CampaignRow::from_campaign(c, args.show_seed))
        .collect();
    print_output(&rows, ctx.format);

    Ok(())
}

async fn hash_link(ctx: CommandContext, args: HashArgs) -> Result<()> {
    let signer = Signer::new(KeyStore::new(ctx.store().await?, ctx.timeout));
    let link = signer
        .mint_link(&args.cid, &args.uid)
        .await
        .map_err(CliError::from)?;

    let rendered = match args.base_url.as_deref() {
        Some(base) => link.url(base)?,
        None => link.path_and_query()?,
    };

    match ctx.format {
        OutputFormat::Json => print_single(&LinkOutput {
            campaign_id: args.cid.to_string(),
            recipient_id: args.uid.to_string(),
            token: link.token.to_string(),
            link: rendered,
        }),
        OutputFormat::Table => println!("{rendered}"),
    }

    Ok(())
}
