//! Open report commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use mailbox_id::CampaignId;
use mailbox_tracker::aggregator::{
    HistoryReport, HistoryRow, OpenStatusReport, OpenStatusRow, RankingReport, RankingRow,
};
use mailbox_tracker::Aggregator;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_info, print_single, print_table, OutputFormat};

use super::CommandContext;

/// Report commands.
#[derive(Debug, Args)]
pub struct ReportCommand {
    #[command(subcommand)]
    command: ReportSubcommand,
}

#[derive(Debug, Subcommand)]
enum ReportSubcommand {
    /// Earliest open per recipient, with the group open rate.
    Open(ReportArgs),

    /// Recipients ranked by open count.
    Openlist(ReportArgs),

    /// Every open, oldest first.
    Openhistory(ReportArgs),
}

#[derive(Debug, Args)]
struct ReportArgs {
    /// Campaign ID.
    cid: CampaignId,

    /// Recipient group.
    group: String,
}

impl ReportCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let aggregator = Aggregator::new(ctx.store().await?, ctx.timeout);

        match self.command {
            ReportSubcommand::Open(args) => {
                let report = aggregator
                    .open_status_by_recipient(&args.cid, &args.group)
                    .await
                    .map_err(CliError::from)?;
                render_open_status(&report, ctx.format);
            }
            ReportSubcommand::Openlist(args) => {
                let report = aggregator
                    .open_ranking(&args.cid, &args.group)
                    .await
                    .map_err(CliError::from)?;
                render_ranking(&report, ctx.format);
            }
            ReportSubcommand::Openhistory(args) => {
                let report = aggregator
                    .open_history(&args.cid, &args.group)
                    .await
                    .map_err(CliError::from)?;
                render_history(&report, ctx.format);
            }
        }

        Ok(())
    }
}

// =============================================================================
// Table rows
// =============================================================================

#[derive(Debug, Tabled)]
struct OpenStatusTableRow {
    id: String,
    email: String,
    fname: String,
    open: String,
}

impl From<&OpenStatusRow> for OpenStatusTableRow {
    fn from(row: &OpenStatusRow) -> Self {
        Self {
            id: row.id.to_string(),
            email: row.email.clone(),
            fname: row.fname.clone(),
            open: row.open.to_string(),
        }
    }
}

#[derive(Debug, Tabled)]
struct RankingTableRow {
    uid: String,
    email: String,
    count: usize,
    first_open: String,
    last_open: String,
}

impl From<&RankingRow> for RankingTableRow {
    fn from(row: &RankingRow) -> Self {
        Self {
            uid: row.uid.to_string(),
            email: row.email.clone(),
            count: row.count,
            first_open: row.first_open.to_rfc3339(),
            last_open: row.last_open.to_rfc3339(),
        }
    }
}

#[derive(Debug, Tabled)]
struct HistoryTableRow {
    no: i64,
    uid: String,
    email: String,
    fname: String,
    created: String,
    ip: String,
    agent: String,
}

impl From<&HistoryRow> for HistoryTableRow {
    fn from(row: &HistoryRow) -> Self {
        Self {
            no: row.no.value(),
            uid: row.uid.to_string(),
            email: row.email.clone(),
            fname: row.fname.clone(),
            created: row.created.to_rfc3339(),
            ip: row.ip.clone(),
            agent: row.agent.clone(),
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn render_open_status(report: &OpenStatusReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_single(report),
        OutputFormat::Table => {
            let rows: Vec<OpenStatusTableRow> = report.rows.iter().map(Into::into).collect();
            print_table(&rows);
            print_info(&open_status_summary(report));
        }
    }
}

fn render_ranking(report: &RankingReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_single(report),
        OutputFormat::Table => {
            let rows: Vec<RankingTableRow> = report.rows.iter().map(Into::into).collect();
            print_table(&rows);
            print_info(&ranking_summary(report));
        }
    }
}

fn render_history(report: &HistoryReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_single(report),
        OutputFormat::Table => {
            let rows: Vec<HistoryTableRow> = report.rows.iter().map(Into::into).collect();
            print_table(&rows);
            println!("Count: {}", report.count);
        }
    }
}

fn open_status_summary(report: &OpenStatusReport) -> String {
    format!(
        "{} of {} opened, open rate {}",
        report.opened, report.total, report.open_rate
    )
}

fn ranking_summary(report: &RankingReport) -> String {
    format!(
        "recipients {}, rate {}, sum {}",
        report.summary.recipients, report.summary.rate, report.summary.sum
    )
}
