//! Macros for defining typed string IDs.

/// Macro to define a typed, string-backed ID.
///
/// This generates a newtype wrapper around `String` with:
/// - `KIND` and `MAX_LEN` constants
/// - `parse()` validating length and alphabet
/// - `as_str()` for borrowing the canonical form
/// - `Display` and `FromStr` implementations
/// - `Serialize` and `Deserialize` implementations that validate on input
///
/// # Example
///
/// ```ignore
/// define_id!(CampaignId, "campaign id", 64, |c: char| c.is_ascii_alphanumeric());
///
/// let id: CampaignId = "abc123".parse()?;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $kind:literal, $max:expr, $allowed:expr) => {
        /// A typed ID for this resource type.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Human-readable name used in error messages.
            pub const KIND: &'static str = $kind;

            /// Maximum length in bytes.
            pub const MAX_LEN: usize = $max;

            /// Parses an ID from a string.
            pub fn parse(s: &str) -> Result<Self, $crate::IdError> {
                if s.is_empty() {
                    return Err($crate::IdError::Empty { kind: Self::KIND });
                }

                if s.len() > Self::MAX_LEN {
                    return Err($crate::IdError::TooLong {
                        kind: Self::KIND,
                        max: Self::MAX_LEN,
                        actual: s.len(),
                    });
                }

                let allowed: fn(char) -> bool = $allowed;
                if let Some(found) = s.chars().find(|c| !allowed(*c)) {
                    return Err($crate::IdError::InvalidCharacter {
                        kind: Self::KIND,
                        found,
                    });
                }

                Ok(Self(s.to_string()))
            }

            /// Returns the canonical string form.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
