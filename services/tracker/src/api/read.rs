//! Tracking pixel endpoint.
//!
//! `GET /read/{campaign_id}?c=..&u=..&h=..` verifies the token and records
//! an open. The response is the same pixel whatever the outcome.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, RawQuery, State},
    http::{header, Extensions, HeaderMap},
    response::IntoResponse,
    routing::get,
    Router,
};
use mailbox_id::{CampaignId, RecipientId};
use mailbox_signing::{TrackingLink, PARAM_CAMPAIGN, PARAM_RECIPIENT};
use tracing::{debug, warn};

use crate::state::AppState;

/// A 1x1 transparent GIF.
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

pub fn routes() -> Router<AppState> {
    Router::new().route("/read/{campaign_id}", get(read))
}

async fn read(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    extensions: Extensions,
) -> impl IntoResponse {
    if let Some(request) = OpenRequest::parse(&campaign_id, query.as_deref()) {
        record(&state, request, &headers, &extensions).await;
    }

    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        PIXEL_GIF,
    )
}

/// A syntactically valid open request, not yet verified.
struct OpenRequest {
    campaign_id: CampaignId,
    recipient_id: RecipientId,
    link: mailbox_signing::ParsedQuery,
}

impl OpenRequest {
    fn parse(path_id: &str, query: Option<&str>) -> Option<Self> {
        let campaign_id = match CampaignId::parse(path_id) {
            Ok(id) => id,
            Err(e) => {
                debug!(error = %e, "Ignoring open with invalid campaign id");
                return None;
            }
        };

        let link = match TrackingLink::parse_query(query.unwrap_or_default()) {
            Ok(link) => link,
            Err(e) => {
                debug!(campaign_id = %campaign_id, error = %e, "Ignoring open with bad query");
                return None;
            }
        };

        if link.params.get(PARAM_CAMPAIGN) != Some(campaign_id.as_str()) {
            debug!(campaign_id = %campaign_id, "Ignoring open whose campaign does not match path");
            return None;
        }

        let recipient_id = match link.params.get(PARAM_RECIPIENT).map(RecipientId::parse) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                debug!(
                    campaign_id = %campaign_id,
                    error = %e,
                    "Ignoring open with invalid recipient"
                );
                return None;
            }
            None => {
                debug!(campaign_id = %campaign_id, "Ignoring open without recipient");
                return None;
            }
        };

        Some(Self {
            campaign_id,
            recipient_id,
            link,
        })
    }
}

async fn record(
    state: &AppState,
    request: OpenRequest,
    headers: &HeaderMap,
    extensions: &Extensions,
) {
    let verified = state
        .signer()
        .verify(
            &request.campaign_id,
            &request.link.params,
            &request.link.token,
        )
        .await;
    if !verified {
        warn!(
            campaign_id = %request.campaign_id,
            recipient_id = %request.recipient_id,
            "Rejected open with invalid token"
        );
        return;
    }

    let ip = client_ip(headers, extensions);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if let Err(e) = state
        .recorder()
        .record_open(&request.campaign_id, &request.recipient_id, &ip, user_agent)
        .await
    {
        warn!(
            campaign_id = %request.campaign_id,
            recipient_id = %request.recipient_id,
            error = %e,
            "Failed to record open"
        );
    }
}

/// First `X-Forwarded-For` hop, else the peer address, else empty.
fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use mailbox_signing::Seed;
    use tower::ServiceExt;

    use super::*;
    use crate::aggregator::Aggregator;
    use crate::api::create_router;
    use crate::store::{Campaign, MemoryStore, Recipient, Store};

    const GROUP: &str = "news";

    async fn seeded() -> (MemoryStore, AppState) {
        let store = MemoryStore::new();
        store
            .create_campaign(&Campaign {
                id: CampaignId::parse("abc123").unwrap(),
                seed: Seed::new("s3edxyz9").unwrap(),
                created: Utc::now(),
                updated: Utc::now(),
            })
            .await
            .unwrap();
        store.add_recipient(Recipient {
            id: RecipientId::parse("42").unwrap(),
            email: "alice@example.com".to_string(),
            group: GROUP.to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
        });
        let state = AppState::new(Arc::new(store.clone()), Duration::from_secs(1));
        (store, state)
    }

    async fn minted_uri(state: &AppState, uid: &str) -> String {
        state
            .signer()
            .mint_link(
                &CampaignId::parse("abc123").unwrap(),
                &RecipientId::parse(uid).unwrap(),
            )
            .await
            .unwrap()
            .path_and_query()
            .unwrap()
    }

    async fn fetch(state: &AppState, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn assert_pixel(status: StatusCode, headers: &HeaderMap, body: &[u8]) {
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/gif");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(body, PIXEL_GIF);
        assert_eq!(body.len(), 43);
    }

    #[tokio::test]
    async fn test_valid_open_is_recorded() {
        let (store, state) = seeded().await;
        let uri = minted_uri(&state, "42").await;

        let request = Request::builder()
            .uri(&uri)
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header(header::USER_AGENT, "Mail/1.0")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = fetch(&state, request).await;
        assert_pixel(status, &headers, &body);
        assert_eq!(store.event_count(), 1);

        let history = Aggregator::new(Arc::new(store.clone()), Duration::from_secs(1))
            .open_history(&CampaignId::parse("abc123").unwrap(), GROUP)
            .await
            .unwrap();
        assert_eq!(history.rows[0].ip, "203.0.113.7");
        assert_eq!(history.rows[0].agent, "Mail/1.0");
    }

    #[tokio::test]
    async fn test_peer_address_used_without_forwarded_header() {
        let (store, state) = seeded().await;
        let uri = minted_uri(&state, "42").await;
        let peer: SocketAddr = "198.51.100.9:40000".parse().unwrap();

        let request = Request::builder()
            .uri(&uri)
            .extension(ConnectInfo(peer))
            .body(Body::empty())
            .unwrap();
        fetch(&state, request).await;

        let history = Aggregator::new(Arc::new(store.clone()), Duration::from_secs(1))
            .open_history(&CampaignId::parse("abc123").unwrap(), GROUP)
            .await
            .unwrap();
        assert_eq!(history.rows[0].ip, "198.51.100.9");
    }

    #[tokio::test]
    async fn test_repeated_opens_each_recorded() {
        let (store, state) = seeded().await;
        let uri = minted_uri(&state, "42").await;
        for _ in 0..3 {
            fetch(&state, get(&uri)).await;
        }
        assert_eq!(store.event_count(), 3);
    }

    #[tokio::test]
    async fn test_tampered_recipient_not_recorded() {
        let (store, state) = seeded().await;
        let uri = minted_uri(&state, "42").await.replace("u=42", "u=43");

        let (status, headers, body) = fetch(&state, get(&uri)).await;
        assert_pixel(status, &headers, &body);
        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn test_campaign_mismatch_not_recorded() {
        let (store, state) = seeded().await;
        store
            .create_campaign(&Campaign {
                id: CampaignId::parse("zzz999").unwrap(),
                seed: Seed::new("s3edxyz9").unwrap(),
                created: Utc::now(),
                updated: Utc::now(),
            })
            .await
            .unwrap();
        let uri = minted_uri(&state, "42")
            .await
            .replace("/read/abc123", "/read/zzz999");

        let (status, _, _) = fetch(&state, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_requests_still_get_pixel() {
        let (store, state) = seeded().await;
        for uri in [
            "/read/abc123",
            "/read/abc123?c=abc123&u=42",
            "/read/abc123?c=abc123&u=42&h=nothex",
            "/read/abc123?c=abc123&c=abc123&u=42&h=00",
            "/read/unknown1?c=unknown1&u=42&h=00",
        ] {
            let (status, headers, body) = fetch(&state, get(uri)).await;
            assert_pixel(status, &headers, &body);
        }
        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn test_store_outage_still_returns_pixel() {
        let (store, state) = seeded().await;
        let uri = minted_uri(&state, "42").await;
        store.set_unavailable(true);

        let (status, headers, body) = fetch(&state, get(&uri)).await;
        assert_pixel(status, &headers, &body);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", " 192.0.2.1 ,10.0.0.1".parse().unwrap());
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo("127.0.0.1:1".parse::<SocketAddr>().unwrap()));

        assert_eq!(client_ip(&headers, &extensions), "192.0.2.1");
        assert_eq!(client_ip(&HeaderMap::new(), &extensions), "127.0.0.1");
        assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), "");
    }
}
