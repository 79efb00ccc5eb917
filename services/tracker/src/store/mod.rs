//! Storage abstraction for campaigns, recipients, and open events.
//!
//! The tracker never talks to a database directly. Every component holds an
//! `Arc<dyn Store>`:
//! - [`crate::db::PgStore`] backs production with Postgres
//! - [`MemoryStore`] backs tests and supports fault injection
//!
//! Row-returning queries yield one `Result` per row so a single undecodable
//! row stays local to that row.

mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailbox_id::{CampaignId, OpenEventNo, RecipientId};
use mailbox_signing::Seed;
use serde::Serialize;
use thiserror::Error;

use crate::error::TrackerError;

pub use memory::MemoryStore;

/// A campaign identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    pub id: CampaignId,
    pub seed: Seed,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// A recipient as owned by the import collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub email: String,
    pub group: String,
    pub first_name: String,
    pub last_name: String,
}

/// Input for appending an open.
#[derive(Debug, Clone)]
pub struct NewOpenEvent {
    pub campaign_id: CampaignId,
    pub recipient_id: RecipientId,
    pub created: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
}

/// A recorded open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenEvent {
    pub no: OpenEventNo,
    pub campaign_id: CampaignId,
    pub recipient_id: RecipientId,
    pub created: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
}

/// An open joined with the recipient it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEventRow {
    pub event: OpenEvent,
    pub email: String,
    pub first_name: String,
}

/// A row that could not be decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("row {position}: {reason}")]
pub struct RowError {
    pub position: usize,
    pub reason: String,
}

impl RowError {
    pub fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }
}

/// Per-row decode outcome.
pub type RowResult<T> = Result<T, RowError>;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// The migrations directory could not be read.
    #[error("cannot load migrations from {dir}: {source}")]
    MigrationDir {
        dir: String,
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// A campaign with this id already exists.
    #[error("campaign id already exists: {0}")]
    DuplicateCampaign(CampaignId),

    /// A referenced row does not exist.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The store cannot serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Query interface consumed by the tracker core.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a campaign. Fails with `DuplicateCampaign` if the id is taken.
    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), StoreError>;

    /// Seed for a campaign, `None` if the campaign does not exist.
    async fn get_seed(&self, id: &CampaignId) -> Result<Option<Seed>, StoreError>;

    /// All campaigns, most recently updated first.
    async fn list_campaigns(&self) -> Result<Vec<RowResult<Campaign>>, StoreError>;

    /// Append an open. The store assigns the sequence number.
    async fn insert_open_event(&self, event: NewOpenEvent) -> Result<OpenEvent, StoreError>;

    /// Recipients in a group, in stable store order.
    async fn recipients_in_group(
        &self,
        group: &str,
    ) -> Result<Vec<RowResult<Recipient>>, StoreError>;

    /// Opens of `campaign_id` by recipients in `group`, in sequence order.
    async fn open_events(
        &self,
        campaign_id: &CampaignId,
        group: &str,
    ) -> Result<Vec<RowResult<OpenEventRow>>, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Run a store call under a deadline.
///
/// An elapsed deadline surfaces as `TrackerError::Timeout`; the abandoned
/// call may or may not have taken effect.
pub async fn with_deadline<T, F>(timeout: Duration, call: F) -> Result<T, TrackerError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(TrackerError::from),
        Err(_) => Err(TrackerError::Timeout(timeout)),
    }
}
