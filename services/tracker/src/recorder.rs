//! Append-only recording of verified opens.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use mailbox_id::{CampaignId, RecipientId};
use tracing::info;

use crate::error::TrackerError;
use crate::store::{with_deadline, NewOpenEvent, OpenEvent, Store};

/// Column width of `open_events.ip`.
pub const MAX_IP_LEN: usize = 64;

/// Column width of `open_events.agent`.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// Persists open events.
///
/// Callers must verify the tracking token first. Every call appends a row;
/// repeated opens are a signal, not noise.
#[derive(Clone)]
pub struct EventRecorder {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl EventRecorder {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Record one open at the current time.
    ///
    /// # Errors
    ///
    /// `Storage` if the insert fails, `Timeout` if the store does not answer
    /// in time. A timed-out insert may still have landed.
    pub async fn record_open(
        &self,
        campaign_id: &CampaignId,
        recipient_id: &RecipientId,
        ip: &str,
        user_agent: &str,
    ) -> Result<OpenEvent, TrackerError> {
        let event = NewOpenEvent {
            campaign_id: campaign_id.clone(),
            recipient_id: recipient_id.clone(),
            created: Utc::now().trunc_subsecs(6),
            ip: truncate(ip, MAX_IP_LEN).to_string(),
            user_agent: truncate(user_agent, MAX_USER_AGENT_LEN).to_string(),
        };

        let stored = with_deadline(self.timeout, self.store.insert_open_event(event)).await?;
        info!(
            campaign_id = %stored.campaign_id,
            recipient_id = %stored.recipient_id,
            no = %stored.no,
            "Open recorded"
        );

        Ok(stored)
    }
}

/// Longest prefix of `s` within `max` bytes, cut on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
