//! Campaign seeds and identifier issuance.

use std::fmt;

use mailbox_id::CampaignId;
use rand::RngCore;

use crate::SigningError;

/// Random bytes drawn for each issued id and seed.
pub const SEED_BYTES: usize = 8;

/// A campaign's secret MAC key.
///
/// Stored as its textual form; the UTF-8 bytes of that text are the key.
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed(String);

impl Seed {
    /// Draw a fresh seed from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self(random_hex(SEED_BYTES))
    }

    /// Wrap a seed loaded from storage.
    pub fn new(value: impl Into<String>) -> Result<Self, SigningError> {
        let value = value.into();
        if value.is_empty() {
            return Err(SigningError::InvalidSeed("empty".to_string()));
        }
        Ok(Self(value))
    }

    /// Key bytes fed to the MAC.
    pub fn key_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Textual form, for persistence and explicit operator display only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed([REDACTED])")
    }
}

/// Issue a fresh campaign id, independent of any seed.
pub fn generate_campaign_id() -> CampaignId {
    let raw = random_hex(SEED_BYTES);
    // Lowercase hex always satisfies the campaign id alphabet.
    CampaignId::parse(&raw).unwrap_or_else(|_| unreachable!("hex campaign id rejected"))
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_seed_shape() {
        let seed = Seed::generate();
        assert_eq!(seed.expose().len(), SEED_BYTES * 2);
        assert!(seed
            .expose()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_generated_values_are_independent() {
        let id = generate_campaign_id();
        let seed = Seed::generate();
        assert_ne!(id.as_str(), seed.expose());
        assert_ne!(Seed::generate(), Seed::generate());
    }

    #[test]
    fn test_seed_debug_is_redacted() {
        let seed = Seed::new("s3edxyz9").unwrap();
        let printed = format!("{:?}", seed);
        assert!(!printed.contains("s3edxyz9"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn test_empty_seed_rejected() {
        assert!(matches!(Seed::new(""), Err(SigningError::InvalidSeed(_))));
    }
}
