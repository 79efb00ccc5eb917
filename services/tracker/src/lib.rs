//! Mailbox campaign tracker.
//!
//! Issues campaign identities, signs and verifies tracking links, records
//! opens, and aggregates them into reports. Ships the `tracker` binary; the
//! library surface is shared with the `mailbox` CLI and integration tests.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod keystore;
pub mod recorder;
pub mod signer;
pub mod state;
pub mod store;

pub use aggregator::Aggregator;
pub use error::TrackerError;
pub use keystore::KeyStore;
pub use recorder::EventRecorder;
pub use signer::Signer;
