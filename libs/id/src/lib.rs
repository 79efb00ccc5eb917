//! # mailbox-id
//!
//! Typed identifiers for the mailbox open-tracking system.
//!
//! ## Design Principles
//!
//! - Campaign ids are issued by the key store; recipient ids by the import
//!   collaborator. Both are opaque strings with strict parsing.
//! - IDs are typed so a recipient id can never be passed where a campaign id
//!   is expected.
//! - IDs roundtrip through their string form (parse → format → parse).
//!
//! ## ID Format
//!
//! - Campaign: 1-64 ASCII alphanumerics, e.g. `9f2c01d47be3a810`
//! - Recipient: 1-64 bytes, no control characters, e.g. `42`
//! - Open event: store-assigned positive integer

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;
