//! Typed ID definitions for campaigns, recipients, and open events.

use crate::define_id;

// =============================================================================
// Campaigns and Recipients
// =============================================================================

define_id!(CampaignId, "campaign id", 64, is_campaign_char);

define_id!(RecipientId, "recipient id", 64, |c: char| !c.is_control());

fn is_campaign_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

// =============================================================================
// Open Events
// =============================================================================

/// Sequence number of a recorded open.
///
/// Assigned by the store on insert, never computed by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpenEventNo(i64);

impl OpenEventNo {
    /// Creates a new OpenEventNo from an i64.
    #[must_use]
    pub const fn new(no: i64) -> Self {
        Self(no)
    }

    /// Returns the underlying i64 value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for OpenEventNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OpenEventNo {
    fn from(no: i64) -> Self {
        Self(no)
    }
}

impl From<OpenEventNo> for i64 {
    fn from(no: OpenEventNo) -> Self {
        no.0
    }
}

impl serde::Serialize for OpenEventNo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for OpenEventNo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let no = i64::deserialize(deserializer)?;
        Ok(Self(no))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_campaign_id_roundtrip() {
        let id: CampaignId = "abc123".parse().unwrap();
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn test_campaign_id_empty() {
        let result: Result<CampaignId, _> = "".parse();
        assert!(result.unwrap_err().is_empty());
    }

    #[test]
    fn test_campaign_id_rejects_punctuation() {
        let result: Result<CampaignId, _> = "abc/123".parse();
        assert_eq!(
            result.unwrap_err(),
            crate::IdError::InvalidCharacter {
                kind: "campaign id",
                found: '/'
            }
        );
    }

    #[test]
    fn test_campaign_id_too_long() {
        let long = "a".repeat(CampaignId::MAX_LEN + 1);
        assert!(matches!(
            CampaignId::parse(&long),
            Err(crate::IdError::TooLong { actual: 65, .. })
        ));
    }

    #[test]
    fn test_recipient_id_allows_any_printable() {
        assert!(RecipientId::parse("42").is_ok());
        assert!(RecipientId::parse("alice@example.com").is_ok());
        assert!(RecipientId::parse("a b").is_ok());
        assert!(RecipientId::parse("a\nb").is_err());
    }

    #[test]
    fn test_campaign_id_json_roundtrip() {
        let id = CampaignId::parse("9f2c01d47be3a810").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"9f2c01d47be3a810\"");
        let parsed: CampaignId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_campaign_id_json_rejects_invalid() {
        let parsed: Result<CampaignId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_open_event_no_roundtrip() {
        let no = OpenEventNo::new(12345);
        let json = serde_json::to_string(&no).unwrap();
        let parsed: OpenEventNo = serde_json::from_str(&json).unwrap();
        assert_eq!(no, parsed);
        assert_eq!(i64::from(parsed), 12345);
    }

    proptest! {
        #[test]
        fn prop_alphanumeric_campaign_ids_parse(s in "[a-zA-Z0-9]{1,64}") {
            let id = CampaignId::parse(&s).unwrap();
            prop_assert_eq!(id.as_str(), s.as_str());
        }

        #[test]
        fn prop_recipient_display_roundtrips(s in "[^\\p{Cc}]{1,16}") {
            prop_assume!(s.len() <= RecipientId::MAX_LEN);
            let id = RecipientId::parse(&s).unwrap();
            let again = RecipientId::parse(&id.to_string()).unwrap();
            prop_assert_eq!(id, again);
        }
    }
}
