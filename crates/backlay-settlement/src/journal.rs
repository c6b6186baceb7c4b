//! Settlement journal: one receipt per settled market.
//!
//! A market can be settled only once. The catalog status is the primary
//! guard; the journal refuses a second receipt for the same market so a
//! status bug can never pay a market out twice. Receipts are never evicted.

use std::collections::HashMap;

use backlay_types::{BacklayError, MarketId, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const RECEIPT_DIGEST_DOMAIN: &[u8] = b"backlay:settlement_receipt:v1:";

/// Summary of one settlement pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub market: MarketId,
    pub winner: String,
    /// Match records resolved.
    pub records: usize,
    /// Wagers moved to `settled`.
    pub wagers_settled: usize,
    /// Σ pools paid to the winning side of each record.
    pub pools_paid: Decimal,
    /// Pools whose claimant was the house (cashed-out positions).
    pub house_claims: Decimal,
    /// Σ unmatched remainders returned to owners.
    pub refunded: Decimal,
    pub settled_at: DateTime<Utc>,
    /// SHA-256 over the fields above.
    pub digest: String,
}

impl SettlementReceipt {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        market: MarketId,
        winner: String,
        records: usize,
        wagers_settled: usize,
        pools_paid: Decimal,
        house_claims: Decimal,
        refunded: Decimal,
        settled_at: DateTime<Utc>,
    ) -> Self {
        let mut receipt = Self {
            market,
            winner,
            records,
            wagers_settled,
            pools_paid,
            house_claims,
            refunded,
            settled_at,
            digest: String::new(),
        };
        receipt.digest = receipt.compute_digest();
        receipt
    }

    /// Total released from escrow by this settlement.
    #[must_use]
    pub fn escrow_released(&self) -> Decimal {
        self.pools_paid + self.refunded
    }

    #[must_use]
    pub fn compute_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(RECEIPT_DIGEST_DOMAIN);
        hasher.update(self.market.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.winner.as_bytes());
        hasher.update([0u8]);
        hasher.update((self.records as u64).to_le_bytes());
        hasher.update((self.wagers_settled as u64).to_le_bytes());
        for amount in [self.pools_paid, self.house_claims, self.refunded] {
            hasher.update(amount.normalize().to_string().as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(self.settled_at.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        hex::encode(hasher.finalize())
    }

    #[must_use]
    pub fn verify(&self) -> bool {
        self.digest == self.compute_digest()
    }
}

/// Append-only store of settlement receipts.
#[derive(Debug, Default)]
pub struct SettlementJournal {
    receipts: Mutex<Vec<SettlementReceipt>>,
}

impl SettlementJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a receipt.
    ///
    /// # Errors
    /// [`BacklayError::MarketAlreadySettled`] if the market already has one.
    pub fn record(&self, receipt: SettlementReceipt) -> Result<()> {
        let mut receipts = self.receipts.lock();
        if receipts.iter().any(|r| r.market == receipt.market) {
            return Err(BacklayError::MarketAlreadySettled(receipt.market));
        }
        receipts.push(receipt);
        Ok(())
    }

    #[must_use]
    pub fn is_settled(&self, market: &MarketId) -> bool {
        self.receipts.lock().iter().any(|r| &r.market == market)
    }

    #[must_use]
    pub fn receipt(&self, market: &MarketId) -> Option<SettlementReceipt> {
        self.receipts.lock().iter().find(|r| &r.market == market).cloned()
    }

    /// All receipts in settlement order.
    #[must_use]
    pub fn receipts(&self) -> Vec<SettlementReceipt> {
        self.receipts.lock().clone()
    }

    /// Winning runner of every settled market.
    #[must_use]
    pub fn winners(&self) -> HashMap<MarketId, String> {
        self.receipts
            .lock()
            .iter()
            .map(|r| (r.market.clone(), r.winner.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.lock().is_empty()
    }
}
