//! Work queue entities: crawl items, their lifecycle status and counters.

use serde::{Deserialize, Serialize};

/// Crawl kind of a queued URL.
///
/// The kind determines both the handler invoked for the item and its
/// traversal priority: structure discovery (catalog, category) runs before
/// the expensive product-detail fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkKind {
    Catalog,
    Category,
    Product,
}

impl WorkKind {
    /// Stable string form used in the `queue.kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Category => "category",
            Self::Product => "product",
        }
    }

    /// Reservation priority tier. Lower runs first.
    pub fn priority(self) -> u8 {
        match self {
            Self::Catalog => 0,
            Self::Category => 1,
            Self::Product => 2,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "catalog" => Some(Self::Catalog),
            "category" => Some(Self::Category),
            "product" => Some(Self::Product),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a queued item.
///
/// Transitions: pending→done, pending→error, and error→pending via the
/// repair tool. Nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    Pending,
    Done,
    Error,
}

impl WorkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Per-status tallies for one kind of work, read as a single snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: i64,
    pub done: i64,
    pub pending: i64,
    pub error: i64,
}
