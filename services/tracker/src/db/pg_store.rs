//! Postgres-backed `Store`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailbox_id::{CampaignId, OpenEventNo, RecipientId};
use mailbox_signing::Seed;
use sqlx::{postgres::PgPool, postgres::PgRow, Row};

use crate::store::{
    Campaign, NewOpenEvent, OpenEvent, OpenEventRow, Recipient, RowError, RowResult, Store,
    StoreError,
};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Store over the `campaigns`, `recipients`, and `open_events` tables.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_code(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

fn decode_rows<T>(
    rows: Vec<PgRow>,
    decode: impl Fn(&PgRow) -> Result<T, String>,
) -> Vec<RowResult<T>> {
    rows.iter()
        .enumerate()
        .map(|(position, row)| {
            decode(row).map_err(|reason| RowError::new(position, reason))
        })
        .collect()
}

fn decode_campaign(row: &PgRow) -> Result<Campaign, String> {
    let id: String = row.try_get("id").map_err(|e| e.to_string())?;
    let seed: String = row.try_get("seed").map_err(|e| e.to_string())?;
    Ok(Campaign {
        id: CampaignId::parse(&id).map_err(|e| e.to_string())?,
        seed: Seed::new(seed).map_err(|e| e.to_string())?,
        created: row.try_get("created").map_err(|e| e.to_string())?,
        updated: row.try_get("updated").map_err(|e| e.to_string())?,
    })
}

fn decode_recipient(row: &PgRow) -> Result<Recipient, String> {
    let id: String = row.try_get("id").map_err(|e| e.to_string())?;
    Ok(Recipient {
        id: RecipientId::parse(&id).map_err(|e| e.to_string())?,
        email: row.try_get("email").map_err(|e| e.to_string())?,
        group: row.try_get("groups").map_err(|e| e.to_string())?,
        first_name: row.try_get("f_name").map_err(|e| e.to_string())?,
        last_name: row.try_get("l_name").map_err(|e| e.to_string())?,
    })
}

fn decode_open_event(row: &PgRow) -> Result<OpenEvent, String> {
    let no: i64 = row.try_get("no").map_err(|e| e.to_string())?;
    let cid: String = row.try_get("cid").map_err(|e| e.to_string())?;
    let uid: String = row.try_get("uid").map_err(|e| e.to_string())?;
    let created: DateTime<Utc> = row.try_get("created").map_err(|e| e.to_string())?;
    Ok(OpenEvent {
        no: OpenEventNo::new(no),
        campaign_id: CampaignId::parse(&cid).map_err(|e| e.to_string())?,
        recipient_id: RecipientId::parse(&uid).map_err(|e| e.to_string())?,
        created,
        ip: row.try_get("ip").map_err(|e| e.to_string())?,
        user_agent: row.try_get("agent").map_err(|e| e.to_string())?,
    })
}

fn decode_open_event_row(row: &PgRow) -> Result<OpenEventRow, String> {
    Ok(OpenEventRow {
        event: decode_open_event(row)?,
        email: row.try_get("email").map_err(|e| e.to_string())?,
        first_name: row.try_get("f_name").map_err(|e| e.to_string())?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn create_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO campaigns (id, seed, created, updated)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(campaign.id.as_str())
        .bind(campaign.seed.expose())
        .bind(campaign.created)
        .bind(campaign.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if db_code(&e).as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::DuplicateCampaign(campaign.id.clone());
            }
            StoreError::Query(e)
        })?;

        Ok(())
    }

    async fn get_seed(&self, id: &CampaignId) -> Result<Option<Seed>, StoreError> {
        let row = sqlx::query("SELECT seed FROM campaigns WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Query)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let seed: String = row.try_get("seed").map_err(StoreError::Query)?;
        Seed::new(seed)
            .map(Some)
            .map_err(|e| StoreError::Constraint(format!("campaign {id}: {e}")))
    }

    async fn list_campaigns(&self) -> Result<Vec<RowResult<Campaign>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, seed, created, updated
            FROM campaigns
            ORDER BY updated DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Query)?;

        Ok(decode_rows(rows, decode_campaign))
    }

    async fn insert_open_event(&self, event: NewOpenEvent) -> Result<OpenEvent, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO open_events (cid, uid, created, ip, agent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING no
            "#,
        )
        .bind(event.campaign_id.as_str())
        .bind(event.recipient_id.as_str())
        .bind(event.created)
        .bind(&event.ip)
        .bind(&event.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if db_code(&e).as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                return StoreError::Constraint(format!(
                    "unknown campaign {} or recipient {}",
                    event.campaign_id, event.recipient_id
                ));
            }
            StoreError::Query(e)
        })?;

        let no: i64 = row.try_get("no").map_err(StoreError::Query)?;
        Ok(OpenEvent {
            no: OpenEventNo::new(no),
            campaign_id: event.campaign_id,
            recipient_id: event.recipient_id,
            created: event.created,
            ip: event.ip,
            user_agent: event.user_agent,
        })
    }

    async fn recipients_in_group(
        &self,
        group: &str,
    ) -> Result<Vec<RowResult<Recipient>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, groups, f_name, l_name
            FROM recipients
            WHERE groups = $1
            ORDER BY id ASC
            "#,
        )
        .bind(group)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Query)?;

        Ok(decode_rows(rows, decode_recipient))
    }

    async fn open_events(
        &self,
        campaign_id: &CampaignId,
        group: &str,
    ) -> Result<Vec<RowResult<OpenEventRow>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT e.no, e.cid, e.uid, e.created, e.ip, e.agent, u.email, u.f_name
            FROM open_events AS e
            JOIN recipients AS u ON u.id = e.uid
            WHERE e.cid = $1 AND u.groups = $2
            ORDER BY e.no ASC
            "#,
        )
        .bind(campaign_id.as_str())
        .bind(group)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Query)?;

        Ok(decode_rows(rows, decode_open_event_row))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::Query)?;
        Ok(())
    }
}
