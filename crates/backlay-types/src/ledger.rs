//! Ledger entry and posting types.
//!
//! Every balance change is an append-only [`LedgerEntry`]. Entries are
//! chained by SHA-256 digest so the log can be audited and replayed.
//! Funds reserved by wagers are held in a per-market escrow account, which
//! makes "total value is conserved" a checkable sum.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{MarketId, MatchId, UserId, WagerId, constants};

/// An account in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum LedgerAccount {
    User(UserId),
    /// Funds reserved by wagers on a market, awaiting settlement.
    Escrow(MarketId),
}

impl std::fmt::Display for LedgerAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(u) => write!(f, "user:{u}"),
            Self::Escrow(m) => write!(f, "escrow:{m}"),
        }
    }
}

/// Why an entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Funds entering the system from account administration.
    Deposit,
    /// Funds leaving the system.
    Withdrawal,
    /// User → escrow, at placement.
    Reserve,
    /// Escrow → user, at settlement or cash-out.
    Release,
    /// User → user, a cash-out paid by the house.
    Transfer,
}

/// What the entry refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryRef {
    Wager(WagerId),
    Match(MatchId),
    Market(MarketId),
    External,
}

/// A single movement of value.
///
/// Postings are what services hand to the ledger; each becomes one or two
/// entries (a transfer debits one account and credits another).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posting {
    Reserve {
        user: UserId,
        market: MarketId,
        amount: Decimal,
        reference: EntryRef,
    },
    Release {
        market: MarketId,
        user: UserId,
        amount: Decimal,
        reference: EntryRef,
    },
    Transfer {
        from: UserId,
        to: UserId,
        amount: Decimal,
        reference: EntryRef,
    },
}

impl Posting {
    #[must_use]
    pub fn amount(&self) -> Decimal {
        match self {
            Self::Reserve { amount, .. }
            | Self::Release { amount, .. }
            | Self::Transfer { amount, .. } => *amount,
        }
    }

    /// `(debited, credited)` accounts.
    #[must_use]
    pub fn accounts(&self) -> (LedgerAccount, LedgerAccount) {
        match self {
            Self::Reserve { user, market, .. } => (
                LedgerAccount::User(user.clone()),
                LedgerAccount::Escrow(market.clone()),
            ),
            Self::Release { market, user, .. } => (
                LedgerAccount::Escrow(market.clone()),
                LedgerAccount::User(user.clone()),
            ),
            Self::Transfer { from, to, .. } => (
                LedgerAccount::User(from.clone()),
                LedgerAccount::User(to.clone()),
            ),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Reserve { .. } => EntryKind::Reserve,
            Self::Release { .. } => EntryKind::Release,
            Self::Transfer { .. } => EntryKind::Transfer,
        }
    }

    #[must_use]
    pub fn reference(&self) -> &EntryRef {
        match self {
            Self::Reserve { reference, .. }
            | Self::Release { reference, .. }
            | Self::Transfer { reference, .. } => reference,
        }
    }
}

/// An append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the log, starting at 0.
    pub seq: u64,
    pub account: LedgerAccount,
    /// Signed change to the account's balance.
    pub delta: Decimal,
    pub kind: EntryKind,
    pub reference: EntryRef,
    pub at: DateTime<Utc>,
    /// Digest of the previous entry (all zero for the first).
    pub prev_digest: [u8; 32],
    pub digest: [u8; 32],
}

impl LedgerEntry {
    /// Build an entry and seal it with its chained digest.
    #[must_use]
    pub fn sealed(
        seq: u64,
        account: LedgerAccount,
        delta: Decimal,
        kind: EntryKind,
        reference: EntryRef,
        prev_digest: [u8; 32],
    ) -> Self {
        let mut entry = Self {
            seq,
            account,
            delta,
            kind,
            reference,
            at: Utc::now(),
            prev_digest,
            digest: [0u8; 32],
        };
        entry.digest = entry.compute_digest();
        entry
    }

    /// Recompute the digest over the entry's content and its predecessor.
    #[must_use]
    pub fn compute_digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::LEDGER_DIGEST_DOMAIN);
        hasher.update(self.seq.to_le_bytes());
        hasher.update(self.account.to_string().as_bytes());
        hasher.update(self.delta.normalize().to_string().as_bytes());
        hasher.update(format!("{:?}|{:?}", self.kind, self.reference).as_bytes());
        hasher.update(self.at.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        hasher.update(self.prev_digest);
        hasher.finalize().into()
    }

    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}
