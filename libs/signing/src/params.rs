//! Authenticated parameter sets and their canonical byte encoding.

use std::collections::BTreeMap;

use mailbox_id::{CampaignId, RecipientId};

use crate::SigningError;

/// Parameter carrying the campaign id.
pub const PARAM_CAMPAIGN: &str = "c";

/// Parameter carrying the recipient id.
pub const PARAM_RECIPIENT: &str = "u";

/// Query key carrying the token. Reserved; never part of a parameter set.
pub const PARAM_TOKEN: &str = "h";

/// Maximum parameter name length in bytes.
pub const MAX_KEY_LENGTH: usize = 32;

/// Maximum parameter value length in bytes.
pub const MAX_VALUE_LENGTH: usize = 4 * 1024;

/// Domain separation tag, bumped whenever the encoding changes.
const ENCODING_TAG: &[u8] = b"mailbox-mac-v1";

/// An ordered set of named string parameters.
///
/// Keys are stored in sorted order for deterministic encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: BTreeMap<String, String>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard `{c, u}` set signed into every tracking link.
    pub fn for_recipient(campaign_id: &CampaignId, recipient_id: &RecipientId) -> Self {
        let mut inner = BTreeMap::new();
        inner.insert(PARAM_CAMPAIGN.to_string(), campaign_id.to_string());
        inner.insert(PARAM_RECIPIENT.to_string(), recipient_id.to_string());
        Self { inner }
    }

    /// Create from an iterator of name-value pairs.
    pub fn try_from_iter<I, K, V>(iter: I) -> Result<Self, SigningError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (k, v) in iter {
            params.set(k, v)?;
        }
        Ok(params)
    }

    /// Set a parameter value.
    ///
    /// Returns the previous value if the name existed.
    pub fn set<K: Into<String>, V: Into<String>>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<Option<String>, SigningError> {
        let key = key.into();
        let value = value.into();

        validate_key(&key)?;
        validate_value(&key, &value)?;

        Ok(self.inner.insert(key, value))
    }

    /// Get a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(|s| s.as_str())
    }

    /// Get the number of parameters.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over name-value pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical bytes authenticated by the MAC.
    pub fn canonical_bytes(&self, campaign_id: &CampaignId) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        put_field(&mut out, ENCODING_TAG);
        put_field(&mut out, campaign_id.as_str().as_bytes());
        out.extend_from_slice(&(self.inner.len() as u32).to_be_bytes());

        for (key, value) in &self.inner {
            put_field(&mut out, key.as_bytes());
            put_field(&mut out, value.as_bytes());
        }

        out
    }
}

fn put_field(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Validate a parameter name.
fn validate_key(key: &str) -> Result<(), SigningError> {
    let invalid = |reason: String| SigningError::InvalidKey {
        key: key.to_string(),
        reason,
    };

    let Some(first) = key.chars().next() else {
        return Err(invalid("name cannot be empty".to_string()));
    };

    if key.len() > MAX_KEY_LENGTH {
        return Err(invalid(format!(
            "name exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }

    if key == PARAM_TOKEN {
        return Err(invalid("name is reserved for the token".to_string()));
    }

    if !first.is_ascii_lowercase() {
        return Err(invalid("must start with a lowercase letter".to_string()));
    }

    if let Some(c) = key.chars().find(|c| !is_key_char(*c)) {
        return Err(invalid(format!("invalid character '{}' in name", c)));
    }

    Ok(())
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// Validate a parameter value.
fn validate_value(key: &str, value: &str) -> Result<(), SigningError> {
    if value.len() > MAX_VALUE_LENGTH {
        return Err(SigningError::InvalidValue {
            key: key.to_string(),
            reason: format!("value exceeds maximum length of {} bytes", MAX_VALUE_LENGTH),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cid(s: &str) -> CampaignId {
        CampaignId::parse(s).unwrap()
    }

    #[rstest]
    #[case("c")]
    #[case("u")]
    #[case("utm_source")]
    #[case("x1")]
    fn test_key_accepted(#[case] key: &str) {
        assert!(validate_key(key).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("h")]
    #[case("1u")]
    #[case("U")]
    #[case("a-b")]
    #[case("a.b")]
    fn test_key_rejected(#[case] key: &str) {
        assert!(matches!(
            validate_key(key),
            Err(SigningError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_value_too_long() {
        let mut params = Params::new();
        let result = params.set("u", "x".repeat(MAX_VALUE_LENGTH + 1));
        assert!(matches!(result, Err(SigningError::InvalidValue { .. })));
    }

    #[test]
    fn test_encoding_independent_of_insertion_order() {
        let p1 = Params::try_from_iter([("u", "42"), ("c", "abc123")]).unwrap();
        let p2 = Params::try_from_iter([("c", "abc123"), ("u", "42")]).unwrap();
        assert_eq!(
            p1.canonical_bytes(&cid("abc123")),
            p2.canonical_bytes(&cid("abc123"))
        );
    }

    #[test]
    fn test_encoding_separates_shifted_boundaries() {
        let p1 = Params::try_from_iter([("c", "1"), ("u", "23")]).unwrap();
        let p2 = Params::try_from_iter([("c", "12"), ("u", "3")]).unwrap();
        assert_ne!(
            p1.canonical_bytes(&cid("abc123")),
            p2.canonical_bytes(&cid("abc123"))
        );
    }

    #[test]
    fn test_encoding_separates_campaign_from_params() {
        // "ab" + {c:"c1"} vs "abc" + {c:"1"} would collide under concatenation.
        let p1 = Params::try_from_iter([("c", "c1")]).unwrap();
        let p2 = Params::try_from_iter([("c", "1")]).unwrap();
        assert_ne!(
            p1.canonical_bytes(&cid("ab")),
            p2.canonical_bytes(&cid("abc"))
        );
    }

    #[test]
    fn test_encoding_layout() {
        let params = Params::try_from_iter([("u", "7")]).unwrap();
        let bytes = params.canonical_bytes(&cid("ab"));

        let mut expected = Vec::new();
        expected.extend_from_slice(&14u32.to_be_bytes());
        expected.extend_from_slice(b"mailbox-mac-v1");
        expected.extend_from_slice(&2u32.to_be_bytes());
        expected.extend_from_slice(b"ab");
        expected.extend_from_slice(&1u32.to_be_bytes());
        expected.extend_from_slice(&1u32.to_be_bytes());
        expected.extend_from_slice(b"u");
        expected.extend_from_slice(&1u32.to_be_bytes());
        expected.extend_from_slice(b"7");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_for_recipient() {
        let params = Params::for_recipient(&cid("abc123"), &RecipientId::parse("42").unwrap());
        assert_eq!(params.get(PARAM_CAMPAIGN), Some("abc123"));
        assert_eq!(params.get(PARAM_RECIPIENT), Some("42"));
        assert_eq!(params.len(), 2);
    }
}
