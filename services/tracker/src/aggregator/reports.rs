//! Report shapes produced by the aggregator.
//!
//! Field names and order are part of the report contract; table and JSON
//! consumers depend on them.

use std::fmt;

use chrono::{DateTime, Utc};
use mailbox_id::{OpenEventNo, RecipientId};
use serde::{Serialize, Serializer};

/// A percentage, or no data when the denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    Percent(f64),
    NoData,
}

impl Rate {
    /// `numerator / denominator * 100`, or `NoData` for a zero denominator.
    pub fn ratio(numerator: usize, denominator: usize) -> Self {
        if denominator == 0 {
            return Rate::NoData;
        }
        Rate::Percent(numerator as f64 / denominator as f64 * 100.0)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rate::Percent(p) => write!(f, "{:.2}%", p),
            Rate::NoData => f.write_str("n/a"),
        }
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rate::Percent(p) => serializer.serialize_f64(*p),
            Rate::NoData => serializer.serialize_none(),
        }
    }
}

/// Earliest open of a recipient, or the explicit not-opened marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    Opened(DateTime<Utc>),
    NotOpened,
}

impl OpenStatus {
    pub fn is_opened(&self) -> bool {
        matches!(self, OpenStatus::Opened(_))
    }
}

impl fmt::Display for OpenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenStatus::Opened(at) => write!(f, "{}", at.to_rfc3339()),
            OpenStatus::NotOpened => f.write_str("Not open"),
        }
    }
}

impl Serialize for OpenStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// Open status by recipient
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenStatusRow {
    pub id: RecipientId,
    pub email: String,
    pub fname: String,
    pub open: OpenStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenStatusReport {
    pub rows: Vec<OpenStatusRow>,
    pub total: usize,
    pub opened: usize,
    pub open_rate: Rate,
}

// =============================================================================
// Open ranking
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub uid: RecipientId,
    pub email: String,
    pub count: usize,
    pub first_open: DateTime<Utc>,
    pub last_open: DateTime<Utc>,
}

/// Trailing summary of a ranking.
///
/// `rate` is total opens per opening recipient, as a percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingSummary {
    pub recipients: usize,
    pub rate: Rate,
    pub sum: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingReport {
    pub rows: Vec<RankingRow>,
    pub summary: RankingSummary,
}

// =============================================================================
// Open history
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub no: OpenEventNo,
    pub uid: RecipientId,
    pub email: String,
    pub fname: String,
    pub created: DateTime<Utc>,
    pub ip: String,
    pub agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryReport {
    pub rows: Vec<HistoryRow>,
    pub count: usize,
}
