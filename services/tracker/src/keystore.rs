//! Campaign identity issuance and seed lookup.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use mailbox_id::CampaignId;
use mailbox_signing::{generate_campaign_id, Seed};
use tracing::{info, warn};

use crate::error::TrackerError;
use crate::store::{with_deadline, Campaign, Store};

/// Issues campaigns and resolves their seeds.
#[derive(Clone)]
pub struct KeyStore {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl KeyStore {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Issue a new campaign with an independent random id and seed.
    ///
    /// # Errors
    ///
    /// `Storage` on id collision or persistence failure, `Timeout` if the
    /// store does not answer in time.
    pub async fn create_campaign(&self) -> Result<Campaign, TrackerError> {
        // Postgres keeps microseconds.
        let now = Utc::now().trunc_subsecs(6);
        let campaign = Campaign {
            id: generate_campaign_id(),
            seed: Seed::generate(),
            created: now,
            updated: now,
        };

        with_deadline(self.timeout, self.store.create_campaign(&campaign)).await?;
        info!(campaign_id = %campaign.id, "Campaign created");

        Ok(campaign)
    }

    /// Issue a campaign, drawing a fresh id after each collision.
    pub async fn create_campaign_with_retry(
        &self,
        max_attempts: u32,
    ) -> Result<Campaign, TrackerError> {
        let mut attempt = 1;
        loop {
            match self.create_campaign().await {
                Err(e) if e.is_campaign_collision() && attempt < max_attempts => {
                    warn!(attempt, "Campaign id collided, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Seed of `id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such campaign exists.
    pub async fn lookup_seed(&self, id: &CampaignId) -> Result<Seed, TrackerError> {
        with_deadline(self.timeout, self.store.get_seed(id))
            .await?
            .ok_or_else(|| TrackerError::NotFound(id.clone()))
    }

    /// All campaigns, most recently updated first. Undecodable rows are skipped.
    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>, TrackerError> {
        let rows = with_deadline(self.timeout, self.store.list_campaigns()).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row {
                Ok(campaign) => Some(campaign),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable campaign row");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};

    fn keystore(store: &MemoryStore) -> KeyStore {
        KeyStore::new(Arc::new(store.clone()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_create_then_lookup() {
        let store = MemoryStore::new();
        let keys = keystore(&store);

        let campaign = keys.create_campaign().await.unwrap();
        assert_eq!(campaign.id.as_str().len(), 16);
        assert_eq!(campaign.seed.expose().len(), 16);
        assert_ne!(campaign.id.as_str(), campaign.seed.expose());
        assert_eq!(campaign.created, campaign.updated);
        assert_eq!(campaign.created.timestamp_subsec_nanos() % 1_000, 0);

        let seed = keys.lookup_seed(&campaign.id).await.unwrap();
        assert_eq!(seed, campaign.seed);
    }

    #[tokio::test]
    async fn test_lookup_unknown_is_not_found() {
        let store = MemoryStore::new();
        let keys = keystore(&store);
        let err = keys
            .lookup_seed(&CampaignId::parse("nope").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_campaign_surfaces_storage_error() {
        let store = MemoryStore::new();
        let campaign = Campaign {
            id: CampaignId::parse("abc123").unwrap(),
            seed: Seed::new("s3edxyz9").unwrap(),
            created: Utc::now(),
            updated: Utc::now(),
        };
        store.create_campaign(&campaign).await.unwrap();

        let err = store.create_campaign(&campaign).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCampaign(_)));
        assert!(TrackerError::from(err).is_campaign_collision());
    }

    #[tokio::test]
    async fn test_retry_draws_fresh_id_after_collisions() {
        let store = MemoryStore::new();
        store.set_campaign_collisions(2);
        let keys = keystore(&store);

        let campaign = keys.create_campaign_with_retry(3).await.unwrap();
        assert_eq!(keys.lookup_seed(&campaign.id).await.unwrap(), campaign.seed);
        assert_eq!(keys.list_campaigns().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let store = MemoryStore::new();
        store.set_campaign_collisions(5);
        let keys = keystore(&store);

        let err = keys.create_campaign_with_retry(3).await.unwrap_err();
        assert!(err.is_campaign_collision());
        assert!(keys.list_campaigns().await.unwrap().is_empty());

        // Three attempts consumed three of the five injected collisions.
        let err = keys.create_campaign_with_retry(2).await.unwrap_err();
        assert!(err.is_campaign_collision());
        assert!(keys.create_campaign_with_retry(1).await.is_ok());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = keystore(&store).create_campaign().await.unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Storage(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = MemoryStore::new();
        store.set_latency(Some(Duration::from_millis(200)));
        let keys = KeyStore::new(Arc::new(store), Duration::from_millis(10));

        let err = keys.create_campaign().await.unwrap_err();
        assert!(matches!(err, TrackerError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_list_orders_by_updated_desc() {
        let store = MemoryStore::new();
        let keys = keystore(&store);
        let first = keys.create_campaign().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = keys.create_campaign().await.unwrap();

        let listed = keys.list_campaigns().await.unwrap();
        let ids: Vec<_> = listed.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
