//! Market reference data.
//!
//! Markets and runners come from the external ingestion feed. The engine only
//! needs existence, the runner list, and the status gate.

use serde::{Deserialize, Serialize};

use crate::MarketId;

/// Trading status of a market.
///
/// `Open → Closed → Settled`. The feed may reopen a closed market; nothing
/// leaves `Settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Closed,
    Settled,
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Settled => write!(f, "settled"),
        }
    }
}

/// A selection within a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runner {
    pub market: MarketId,
    pub selection_name: String,
}

/// A market and its runners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub name: String,
    pub status: MarketStatus,
    pub runners: Vec<Runner>,
}

impl Market {
    /// An open market with the given selection names.
    #[must_use]
    pub fn open<I, S>(id: impl Into<String>, name: impl Into<String>, runners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = MarketId::new(id);
        let runners = runners
            .into_iter()
            .map(|r| Runner {
                market: id.clone(),
                selection_name: r.into(),
            })
            .collect();
        Self {
            id,
            name: name.into(),
            status: MarketStatus::Open,
            runners,
        }
    }

    #[must_use]
    pub fn has_runner(&self, selection_name: &str) -> bool {
        self.runners.iter().any(|r| r.selection_name == selection_name)
    }

    #[must_use]
    pub fn runner_names(&self) -> Vec<&str> {
        self.runners.iter().map(|r| r.selection_name.as_str()).collect()
    }
}
