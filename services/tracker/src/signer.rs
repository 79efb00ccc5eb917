//! Token minting and verification against stored campaign seeds.

use mailbox_id::{CampaignId, RecipientId};
use mailbox_signing::{Params, Token, TrackingLink};
use tracing::debug;

use crate::error::TrackerError;
use crate::keystore::KeyStore;

/// Signs and verifies parameter sets for a campaign.
///
/// The seed is looked up per call and never leaves this type.
#[derive(Clone)]
pub struct Signer {
    keys: KeyStore,
}

impl Signer {
    pub fn new(keys: KeyStore) -> Self {
        Self { keys }
    }

    /// Token for `params` under `campaign_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown campaign, `MalformedInput` for an empty
    /// parameter set, `Storage`/`Timeout` from the seed lookup.
    pub async fn make_mac(
        &self,
        campaign_id: &CampaignId,
        params: &Params,
    ) -> Result<Token, TrackerError> {
        if params.is_empty() {
            return Err(mailbox_signing::SigningError::EmptyParams.into());
        }
        let seed = self.keys.lookup_seed(campaign_id).await?;
        Ok(mailbox_signing::make_mac(&seed, campaign_id, params)?)
    }

    /// Whether `token` authenticates `params` under `campaign_id`.
    ///
    /// Unknown campaigns, malformed tokens, and store failures all yield false.
    pub async fn verify(&self, campaign_id: &CampaignId, params: &Params, token: &str) -> bool {
        if params.is_empty() {
            return false;
        }

        match self.keys.lookup_seed(campaign_id).await {
            Ok(seed) => mailbox_signing::verify(&seed, campaign_id, params, token),
            Err(e) => {
                debug!(campaign_id = %campaign_id, error = %e, "Seed lookup failed during verify");
                false
            }
        }
    }

    /// Signed tracking link for one recipient.
    pub async fn mint_link(
        &self,
        campaign_id: &CampaignId,
        recipient_id: &RecipientId,
    ) -> Result<TrackingLink, TrackerError> {
        let params = Params::for_recipient(campaign_id, recipient_id);
        let token = self.make_mac(campaign_id, &params).await?;
        Ok(TrackingLink::new(campaign_id.clone(), params, token))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use mailbox_signing::{Seed, SigningError};

    use super::*;
    use crate::store::{Campaign, MemoryStore, Store};

    async fn signer_with(cid: &str, seed: &str) -> (MemoryStore, Signer) {
        let store = MemoryStore::new();
        store
            .create_campaign(&Campaign {
                id: CampaignId::parse(cid).unwrap(),
                seed: Seed::new(seed).unwrap(),
                created: Utc::now(),
                updated: Utc::now(),
            })
            .await
            .unwrap();
        let keys = KeyStore::new(Arc::new(store.clone()), Duration::from_secs(1));
        (store, Signer::new(keys))
    }

    fn params(c: &str, u: &str) -> Params {
        Params::try_from_iter([("c", c), ("u", u)]).unwrap()
    }

    #[tokio::test]
    async fn test_scenario_abc123() {
        let (_, signer) = signer_with("abc123", "s3edxyz9").await;
        let campaign = CampaignId::parse("abc123").unwrap();

        let token = signer
            .make_mac(&campaign, &params("abc123", "42"))
            .await
            .unwrap()
            .to_string();

        assert!(
            signer
                .verify(&campaign, &params("abc123", "42"), &token)
                .await
        );
        assert!(
            !signer
                .verify(&campaign, &params("abc123", "43"), &token)
                .await
        );
    }

    #[tokio::test]
    async fn test_matches_pure_function() {
        let (_, signer) = signer_with("abc123", "s3edxyz9").await;
        let campaign = CampaignId::parse("abc123").unwrap();
        let p = params("abc123", "42");

        let via_service = signer.make_mac(&campaign, &p).await.unwrap();
        let direct =
            mailbox_signing::make_mac(&Seed::new("s3edxyz9").unwrap(), &campaign, &p).unwrap();
        assert_eq!(via_service, direct);
    }

    #[tokio::test]
    async fn test_unknown_campaign() {
        let (_, signer) = signer_with("abc123", "s3edxyz9").await;
        let other = CampaignId::parse("zzz999").unwrap();

        let err = signer
            .make_mac(&other, &params("zzz999", "42"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(
            !signer
                .verify(&other, &params("zzz999", "42"), &"0".repeat(64))
                .await
        );
    }

    #[tokio::test]
    async fn test_empty_params_is_malformed_input() {
        let (_, signer) = signer_with("abc123", "s3edxyz9").await;
        let err = signer
            .make_mac(&CampaignId::parse("abc123").unwrap(), &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::MalformedInput(SigningError::EmptyParams)
        ));
    }

    #[tokio::test]
    async fn test_verify_false_when_store_down() {
        let (store, signer) = signer_with("abc123", "s3edxyz9").await;
        let campaign = CampaignId::parse("abc123").unwrap();
        let p = params("abc123", "42");
        let token = signer.make_mac(&campaign, &p).await.unwrap().to_string();

        store.set_unavailable(true);
        assert!(!signer.verify(&campaign, &p, &token).await);
    }

    #[tokio::test]
    async fn test_mint_link_verifies() {
        let (_, signer) = signer_with("abc123", "s3edxyz9").await;
        let campaign = CampaignId::parse("abc123").unwrap();
        let link = signer
            .mint_link(&campaign, &RecipientId::parse("42").unwrap())
            .await
            .unwrap();

        let rendered = link.path_and_query().unwrap();
        let (path, query) = rendered.split_once('?').unwrap();
        assert_eq!(path, "/read/abc123");

        let parsed = TrackingLink::parse_query(query).unwrap();
        assert!(
            signer
                .verify(&campaign, &parsed.params, &parsed.token)
                .await
        );
    }

    #[tokio::test]
    async fn test_campaigns_with_distinct_seeds_disagree() {
        let (store, signer) = signer_with("aaa111", "seedone1").await;
        store
            .create_campaign(&Campaign {
                id: CampaignId::parse("bbb222").unwrap(),
                seed: Seed::new("seedtwo2").unwrap(),
                created: Utc::now(),
                updated: Utc::now(),
            })
            .await
            .unwrap();

        let p = params("x", "42");
        let t1 = signer
            .make_mac(&CampaignId::parse("aaa111").unwrap(), &p)
            .await
            .unwrap();
        let t2 = signer
            .make_mac(&CampaignId::parse("bbb222").unwrap(), &p)
            .await
            .unwrap();
        assert_ne!(t1, t2);
    }
}
