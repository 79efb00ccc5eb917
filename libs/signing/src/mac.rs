//! HMAC-SHA256 token generation and verification.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use mailbox_id::CampaignId;
use sha2::Sha256;

use crate::{Params, Seed, SigningError};

type HmacSha256 = Hmac<Sha256>;

/// Rendered token length: 32 bytes as lowercase hex.
pub const TOKEN_HEX_LEN: usize = 64;

/// A tracking token: the MAC over a campaign id and parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token([u8; 32]);

impl Token {
    /// Raw MAC bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Token {
    type Err = SigningError;

    /// Only the canonical lowercase rendering is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = s.len() == TOKEN_HEX_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !canonical {
            return Err(SigningError::MalformedToken);
        }

        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).map_err(|_| SigningError::MalformedToken)?;
        Ok(Self(out))
    }
}

/// Compute the token for `params` under `campaign_id`, keyed by `seed`.
///
/// # Errors
///
/// Returns `SigningError::EmptyParams` for an empty parameter set.
pub fn make_mac(
    seed: &Seed,
    campaign_id: &CampaignId,
    params: &Params,
) -> Result<Token, SigningError> {
    if params.is_empty() {
        return Err(SigningError::EmptyParams);
    }

    let digest = keyed_mac(seed, campaign_id, params)?
        .finalize()
        .into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(Token(out))
}

/// Check `token` against the expected MAC in constant time.
///
/// Any malformed input yields `false`.
pub fn verify(seed: &Seed, campaign_id: &CampaignId, params: &Params, token: &str) -> bool {
    if params.is_empty() {
        return false;
    }

    let Ok(token) = token.parse::<Token>() else {
        return false;
    };

    match keyed_mac(seed, campaign_id, params) {
        Ok(mac) => mac.verify_slice(token.as_bytes()).is_ok(),
        Err(_) => false,
    }
}

fn keyed_mac(
    seed: &Seed,
    campaign_id: &CampaignId,
    params: &Params,
) -> Result<HmacSha256, SigningError> {
    let mut mac = HmacSha256::new_from_slice(seed.key_bytes())
        .map_err(|e| SigningError::InvalidSeed(e.to_string()))?;
    mac.update(&params.canonical_bytes(campaign_id));
    Ok(mac)
}
