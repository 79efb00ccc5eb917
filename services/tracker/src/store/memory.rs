//! In-memory store for tests.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use mailbox_id::{CampaignId, OpenEventNo, RecipientId};
use mailbox_signing::Seed;

use super::{
    Campaign, NewOpenEvent, OpenEvent, OpenEventRow, Recipient, RowError, RowResult, Store,
    StoreError,
};

enum Slot<T> {
    Valid(T),
    Corrupt(String),
}

struct CorruptEvent {
    campaign_id: CampaignId,
    group: String,
    reason: String,
}

#[derive(Default)]
struct Inner {
    campaigns: Vec<Campaign>,
    recipients: Vec<(String, Slot<Recipient>)>,
    events: Vec<OpenEvent>,
    corrupt_events: Vec<(usize, CorruptEvent)>,
    next_no: i64,
    campaign_collisions: u32,
    unavailable: bool,
    latency: Option<Duration>,
}

/// A `Store` held entirely in memory.
///
/// Mirrors the Postgres constraints: unique campaign ids and existing
/// campaign and recipient references on insert.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipient, as the import collaborator would.
    pub fn add_recipient(&self, recipient: Recipient) {
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .recipients
                .push((recipient.group.clone(), Slot::Valid(recipient)));
        }
    }

    /// Add a recipient row that fails to decode.
    pub fn add_corrupt_recipient(&self, group: &str, reason: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .recipients
                .push((group.to_string(), Slot::Corrupt(reason.to_string())));
        }
    }

    /// Add an open-event row that fails to decode.
    pub fn add_corrupt_event(&self, campaign_id: &CampaignId, group: &str, reason: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            let position = inner.events.len();
            inner.corrupt_events.push((
                position,
                CorruptEvent {
                    campaign_id: campaign_id.clone(),
                    group: group.to_string(),
                    reason: reason.to_string(),
                },
            ));
        }
    }

    /// Make every call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.unavailable = unavailable;
        }
    }

    /// Reject the next `count` campaign inserts as duplicate ids.
    pub fn set_campaign_collisions(&self, count: u32) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.campaign_collisions = count;
        }
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.latency = latency;
        }
    }

    /// Number of stored open events.
    pub fn event_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.events.len())
            .unwrap_or(0)
    }

    async fn enter(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let latency = self.lock()?.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let inner = self.lock()?;
        if inner.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(inner)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

fn group_of<'a>(inner: &'a Inner, recipient_id: &RecipientId) -> Option<&'a Recipient> {
    inner.recipients.iter().find_map(|(_, slot)| match slot {
        Slot::Valid(r) if &r.id == recipient_id => Some(r),
        _ => None,
    })
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        let mut inner = self.enter().await?;
        if inner.campaign_collisions > 0 {
            inner.campaign_collisions -= 1;
            return Err(StoreError::DuplicateCampaign(campaign.id.clone()));
        }
        if inner.campaigns.iter().any(|c| c.id == campaign.id) {
            return Err(StoreError::DuplicateCampaign(campaign.id.clone()));
        }
        inner.campaigns.push(campaign.clone());
        Ok(())
    }

    async fn get_seed(&self, id: &CampaignId) -> Result<Option<Seed>, StoreError> {
        let inner = self.enter().await?;
        Ok(inner
            .campaigns
            .iter()
            .find(|c| &c.id == id)
            .map(|c| c.seed.clone()))
    }

    async fn list_campaigns(&self) -> Result<Vec<RowResult<Campaign>>, StoreError> {
        let inner = self.enter().await?;
        let mut campaigns = inner.campaigns.clone();
        campaigns.sort_by(|a, b| b.updated.cmp(&a.updated));
        Ok(campaigns.into_iter().map(Ok).collect())
    }

    async fn insert_open_event(&self, event: NewOpenEvent) -> Result<OpenEvent, StoreError> {
        let mut inner = self.enter().await?;

        if !inner.campaigns.iter().any(|c| c.id == event.campaign_id) {
            return Err(StoreError::Constraint(format!(
                "unknown campaign {}",
                event.campaign_id
            )));
        }
        if group_of(&inner, &event.recipient_id).is_none() {
            return Err(StoreError::Constraint(format!(
                "unknown recipient {}",
                event.recipient_id
            )));
        }

        inner.next_no += 1;
        let stored = OpenEvent {
            no: OpenEventNo::new(inner.next_no),
            campaign_id: event.campaign_id,
            recipient_id: event.recipient_id,
            created: event.created,
            ip: event.ip,
            user_agent: event.user_agent,
        };
        inner.events.push(stored.clone());
        Ok(stored)
    }

    async fn recipients_in_group(
        &self,
        group: &str,
    ) -> Result<Vec<RowResult<Recipient>>, StoreError> {
        let inner = self.enter().await?;
        Ok(inner
            .recipients
            .iter()
            .filter(|(g, _)| g == group)
            .enumerate()
            .map(|(position, (_, slot))| match slot {
                Slot::Valid(r) => Ok(r.clone()),
                Slot::Corrupt(reason) => Err(RowError::new(position, reason.clone())),
            })
            .collect())
    }

    async fn open_events(
        &self,
        campaign_id: &CampaignId,
        group: &str,
    ) -> Result<Vec<RowResult<OpenEventRow>>, StoreError> {
        let inner = self.enter().await?;
        let mut rows = Vec::new();

        for (index, event) in inner.events.iter().enumerate() {
            for (_, corrupt) in inner.corrupt_events.iter().filter(|(at, _)| *at == index) {
                if &corrupt.campaign_id == campaign_id && corrupt.group == group {
                    rows.push(Err(RowError::new(rows.len(), corrupt.reason.clone())));
                }
            }

            if &event.campaign_id != campaign_id {
                continue;
            }
            let Some(recipient) = group_of(&inner, &event.recipient_id) else {
                continue;
            };
            if recipient.group != group {
                continue;
            }

            rows.push(Ok(OpenEventRow {
                event: event.clone(),
                email: recipient.email.clone(),
                first_name: recipient.first_name.clone(),
            }));
        }

        for (_, corrupt) in inner
            .corrupt_events
            .iter()
            .filter(|(at, _)| *at >= inner.events.len())
        {
            if &corrupt.campaign_id == campaign_id && corrupt.group == group {
                rows.push(Err(RowError::new(rows.len(), corrupt.reason.clone())));
            }
        }

        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.enter().await.map(|_| ())
    }
}
