//! Tracker error types.

use std::time::Duration;

use mailbox_id::CampaignId;
use mailbox_signing::SigningError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the key store, signer, recorder, and aggregator.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Unknown campaign.
    #[error("campaign not found: {0}")]
    NotFound(CampaignId),

    /// The persistence layer failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// A store call exceeded its deadline.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// Unusable parameter set.
    #[error("malformed input: {0}")]
    MalformedInput(#[from] SigningError),
}

impl TrackerError {
    /// Returns true if the campaign id collided with an existing one.
    pub fn is_campaign_collision(&self) -> bool {
        matches!(
            self,
            TrackerError::Storage(StoreError::DuplicateCampaign(_))
        )
    }

    /// Returns true for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::NotFound(_))
    }
}
