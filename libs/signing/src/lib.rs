//! Campaign signature scheme for open-tracking links.
//!
//! A campaign owns a secret [`Seed`]. Tracking links carry plaintext
//! parameters (campaign id `c`, recipient id `u`) plus a [`Token`]: an
//! HMAC-SHA256 over a canonical encoding of the campaign id and the
//! parameters, keyed by the seed.
//!
//! # Canonical encoding
//!
//! ```text
//! len(tag) tag  len(cid) cid  count  { len(key) key len(value) value }*
//! ```
//!
//! Every length is a big-endian `u32` and parameters are emitted in
//! ascending key order, so two distinct parameter sets can never produce
//! the same byte string (`{a:"1",b:"23"}` and `{a:"12",b:"3"}` differ).
//!
//! The scheme authenticates parameters; it does not hide them.

mod error;
mod link;
mod mac;
mod params;
mod seed;

pub use error::SigningError;
pub use link::{ParsedQuery, TrackingLink, READ_PATH};
pub use mac::{make_mac, verify, Token, TOKEN_HEX_LEN};
pub use params::{
    Params, MAX_KEY_LENGTH, MAX_VALUE_LENGTH, PARAM_CAMPAIGN, PARAM_RECIPIENT, PARAM_TOKEN,
};
pub use seed::{generate_campaign_id, Seed, SEED_BYTES};
