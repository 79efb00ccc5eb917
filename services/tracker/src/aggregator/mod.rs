//! Open-event aggregation.
//!
//! Three read-only reports over `(campaign, group)`:
//! - open status by recipient, with the group open rate
//! - ranking by open count, with first/last open and a summary row
//! - chronological open history with provenance
//!
//! Each call reads the store once per relation and holds no state between
//! calls. Rows that fail to decode are logged and skipped.

mod reports;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mailbox_id::{CampaignId, RecipientId};
use tracing::{debug, warn};

use crate::error::TrackerError;
use crate::store::{with_deadline, OpenEventRow, Recipient, RowResult, Store};

pub use reports::{
    HistoryReport, HistoryRow, OpenStatus, OpenStatusReport, OpenStatusRow, RankingReport,
    RankingRow, RankingSummary, Rate,
};

/// Computes open reports.
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Every recipient of `group` with their earliest open of `campaign_id`.
    pub async fn open_status_by_recipient(
        &self,
        campaign_id: &CampaignId,
        group: &str,
    ) -> Result<OpenStatusReport, TrackerError> {
        let recipients = self.recipients(campaign_id, group).await?;
        let events = self.events(campaign_id, group).await?;

        let mut earliest: HashMap<RecipientId, DateTime<Utc>> = HashMap::new();
        for row in &events {
            earliest
                .entry(row.event.recipient_id.clone())
                .and_modify(|at| *at = (*at).min(row.event.created))
                .or_insert(row.event.created);
        }

        let rows: Vec<OpenStatusRow> = recipients
            .into_iter()
            .map(|r| OpenStatusRow {
                open: earliest
                    .get(&r.id)
                    .map_or(OpenStatus::NotOpened, |at| OpenStatus::Opened(*at)),
                id: r.id,
                email: r.email,
                fname: r.first_name,
            })
            .collect();

        let total = rows.len();
        let opened = rows.iter().filter(|r| r.open.is_opened()).count();

        Ok(OpenStatusReport {
            rows,
            total,
            opened,
            open_rate: Rate::ratio(opened, total),
        })
    }

    /// Recipients of `group` who opened `campaign_id`, most opens first.
    ///
    /// Equal counts keep storage order: the order of each recipient's first
    /// stored open.
    pub async fn open_ranking(
        &self,
        campaign_id: &CampaignId,
        group: &str,
    ) -> Result<RankingReport, TrackerError> {
        let events = self.events(campaign_id, group).await?;

        let mut rows: Vec<RankingRow> = Vec::new();
        let mut index: HashMap<RecipientId, usize> = HashMap::new();

        for row in events {
            let created = row.event.created;
            match index.get(&row.event.recipient_id) {
                Some(&at) => {
                    let entry = &mut rows[at];
                    entry.count += 1;
                    entry.first_open = entry.first_open.min(created);
                    entry.last_open = entry.last_open.max(created);
                }
                None => {
                    index.insert(row.event.recipient_id.clone(), rows.len());
                    rows.push(RankingRow {
                        uid: row.event.recipient_id,
                        email: row.email,
                        count: 1,
                        first_open: created,
                        last_open: created,
                    });
                }
            }
        }

        // Stable: ties stay in first-seen order.
        rows.sort_by(|a, b| b.count.cmp(&a.count));

        let recipients = rows.len();
        let sum = rows.iter().map(|r| r.count).sum();

        Ok(RankingReport {
            rows,
            summary: RankingSummary {
                recipients,
                rate: Rate::ratio(sum, recipients),
                sum,
            },
        })
    }

    /// Every open of `campaign_id` by `group`, oldest first.
    pub async fn open_history(
        &self,
        campaign_id: &CampaignId,
        group: &str,
    ) -> Result<HistoryReport, TrackerError> {
        let mut events = self.events(campaign_id, group).await?;
        events.sort_by(|a, b| {
            a.event
                .created
                .cmp(&b.event.created)
                .then(a.event.no.cmp(&b.event.no))
        });

        let rows: Vec<HistoryRow> = events
            .into_iter()
            .map(|row| HistoryRow {
                no: row.event.no,
                uid: row.event.recipient_id,
                email: row.email,
                fname: row.first_name,
                created: row.event.created,
                ip: row.event.ip,
                agent: row.event.user_agent,
            })
            .collect();

        Ok(HistoryReport {
            count: rows.len(),
            rows,
        })
    }

    async fn recipients(
        &self,
        campaign_id: &CampaignId,
        group: &str,
    ) -> Result<Vec<Recipient>, TrackerError> {
        let rows = with_deadline(self.timeout, self.store.recipients_in_group(group)).await?;
        Ok(keep_decoded(rows, campaign_id, group, "recipient"))
    }

    async fn events(
        &self,
        campaign_id: &CampaignId,
        group: &str,
    ) -> Result<Vec<OpenEventRow>, TrackerError> {
        let rows = with_deadline(self.timeout, self.store.open_events(campaign_id, group)).await?;
        let events = keep_decoded(rows, campaign_id, group, "open event");
        debug!(campaign_id = %campaign_id, group, events = events.len(), "Loaded open events");
        Ok(events)
    }
}

fn keep_decoded<T>(
    rows: Vec<RowResult<T>>,
    campaign_id: &CampaignId,
    group: &str,
    what: &'static str,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match row {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    campaign_id = %campaign_id,
                    group,
                    row = what,
                    error = %e,
                    "Skipping undecodable row"
                );
                None
            }
        })
        .collect()
}
