//! Tracking link rendering and query parsing.

use std::collections::BTreeSet;

use mailbox_id::CampaignId;

use crate::{Params, SigningError, Token, PARAM_TOKEN};

/// Path prefix of the tracking endpoint.
pub const READ_PATH: &str = "/read";

/// A signed open-tracking link.
///
/// Renders as `/read/{campaign_id}?{params}&h={token}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingLink {
    pub campaign_id: CampaignId,
    pub params: Params,
    pub token: Token,
}

/// Parameters and token recovered from a tracking request's query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub params: Params,
    pub token: String,
}

impl TrackingLink {
    pub fn new(campaign_id: CampaignId, params: Params, token: Token) -> Self {
        Self {
            campaign_id,
            params,
            token,
        }
    }

    /// Path plus form-urlencoded query, parameters first, token last.
    pub fn path_and_query(&self) -> Result<String, SigningError> {
        let token = self.token.to_string();
        let mut pairs: Vec<(&str, &str)> = self.params.iter().collect();
        pairs.push((PARAM_TOKEN, token.as_str()));

        let query =
            serde_urlencoded::to_string(pairs).map_err(|e| SigningError::Encoding(e.to_string()))?;
        Ok(format!("{}/{}?{}", READ_PATH, self.campaign_id, query))
    }

    /// Absolute URL under `base`, e.g. `https://mail.example.com`.
    pub fn url(&self, base: &str) -> Result<String, SigningError> {
        Ok(format!(
            "{}{}",
            base.trim_end_matches('/'),
            self.path_and_query()?
        ))
    }

    /// Split a raw query string into the signed parameters and the token.
    ///
    /// Repeated keys are rejected: a signed set has exactly one value per name.
    pub fn parse_query(query: &str) -> Result<ParsedQuery, SigningError> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query).map_err(|e| SigningError::Encoding(e.to_string()))?;

        let mut seen = BTreeSet::new();
        let mut params = Params::new();
        let mut token = None;

        for (key, value) in pairs {
            if !seen.insert(key.clone()) {
                return Err(SigningError::DuplicateParam(key));
            }
            if key == PARAM_TOKEN {
                token = Some(value);
            } else {
                params.set(key, value)?;
            }
        }

        let token = token.ok_or(SigningError::MissingToken)?;
        if params.is_empty() {
            return Err(SigningError::EmptyParams);
        }

        Ok(ParsedQuery { params, token })
    }
}
