//! The account ledger.
//!
//! Holds every user balance and every market escrow. All state sits behind a
//! single mutex, so mutations touching the same account are serialized and a
//! posting batch is applied as one unit: every debit in the batch is checked
//! against a scratch copy of the balances before any entry is written.
//!
//! Balances are a cache over the entry log. [`AccountLedger::replay`]
//! rebuilds them from the log; [`AccountLedger::verify_chain`] re-checks the
//! digest chain.

use std::collections::HashMap;

use backlay_types::{
    BacklayError, EntryKind, EntryRef, LedgerAccount, LedgerEntry, MarketId, Posting, Result,
    UserId,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::supply_conservation::SupplyConservation;

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<LedgerAccount, Decimal>,
    entries: Vec<LedgerEntry>,
    supply: SupplyConservation,
}

impl LedgerState {
    fn balance_of(&self, account: &LedgerAccount) -> Decimal {
        self.balances.get(account).copied().unwrap_or(Decimal::ZERO)
    }

    fn last_digest(&self) -> [u8; 32] {
        self.entries.last().map_or([0u8; 32], |e| e.digest)
    }

    fn append(&mut self, account: LedgerAccount, delta: Decimal, kind: EntryKind, reference: EntryRef) {
        let seq = self.entries.len() as u64;
        let entry = LedgerEntry::sealed(seq, account.clone(), delta, kind, reference, self.last_digest());
        *self.balances.entry(account).or_insert(Decimal::ZERO) += delta;
        self.entries.push(entry);
    }
}

/// Serialized account balances with an append-only entry log.
#[derive(Debug, Default)]
pub struct AccountLedger {
    state: Mutex<LedgerState>,
}

impl AccountLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =================================================================
    // Account administration (external funding path)
    // =================================================================

    /// Create an account (if missing) funded with `opening_balance`.
    pub fn open_account(&self, user: &UserId, opening_balance: Decimal) -> Result<()> {
        ensure_non_negative(opening_balance)?;
        let mut state = self.state.lock();
        let account = LedgerAccount::User(user.clone());
        state.balances.entry(account.clone()).or_insert(Decimal::ZERO);
        if opening_balance > Decimal::ZERO {
            state.append(account, opening_balance, EntryKind::Deposit, EntryRef::External);
            state.supply.record_deposit(opening_balance);
        }
        tracing::debug!(user = %user, opening_balance = %opening_balance, "account opened");
        Ok(())
    }

    /// Add funds from outside the system. Never fails for want of funds.
    pub fn credit(&self, user: &UserId, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        let mut state = self.state.lock();
        state.append(LedgerAccount::User(user.clone()), amount, EntryKind::Deposit, EntryRef::External);
        state.supply.record_deposit(amount);
        Ok(())
    }

    /// Remove funds to outside the system.
    ///
    /// # Errors
    /// `InsufficientFunds` if the balance is below `amount`; nothing changes.
    pub fn debit(&self, user: &UserId, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        let mut state = self.state.lock();
        let account = LedgerAccount::User(user.clone());
        let available = state.balance_of(&account);
        if available < amount {
            return Err(BacklayError::InsufficientFunds {
                user: user.clone(),
                needed: amount,
                available,
            });
        }
        state.append(account, -amount, EntryKind::Withdrawal, EntryRef::External);
        state.supply.record_withdrawal(amount);
        Ok(())
    }

    // =================================================================
    // Posting batches
    // =================================================================

    /// Apply a batch of postings all-or-nothing.
    ///
    /// Postings are checked in order against a scratch copy of the touched
    /// balances, so a release earlier in the batch can fund a reserve later
    /// in it. Zero-amount postings are skipped. Returns the number of
    /// entries written.
    ///
    /// # Errors
    /// - `ValidationError` for a negative amount
    /// - `InsufficientFunds` if a user account would go negative
    /// - `SupplyInvariantViolation` if an escrow would go negative
    pub fn apply(&self, postings: &[Posting]) -> Result<usize> {
        let mut state = self.state.lock();

        let mut scratch: HashMap<LedgerAccount, Decimal> = HashMap::new();
        for posting in postings {
            let amount = posting.amount();
            ensure_non_negative(amount)?;
            if amount.is_zero() {
                continue;
            }
            let (debited, credited) = posting.accounts();
            let available = *scratch
                .entry(debited.clone())
                .or_insert_with(|| state.balance_of(&debited));
            if available < amount {
                return Err(match debited {
                    LedgerAccount::User(user) => BacklayError::InsufficientFunds {
                        user,
                        needed: amount,
                        available,
                    },
                    LedgerAccount::Escrow(market) => BacklayError::SupplyInvariantViolation {
                        reason: format!(
                            "escrow {market} holds {available}, cannot release {amount}"
                        ),
                    },
                });
            }
            scratch.insert(debited, available - amount);
            let credit_base = *scratch
                .entry(credited.clone())
                .or_insert_with(|| state.balance_of(&credited));
            scratch.insert(credited, credit_base + amount);
        }

        let mut written = 0;
        for posting in postings {
            let amount = posting.amount();
            if amount.is_zero() {
                continue;
            }
            let (debited, credited) = posting.accounts();
            let kind = posting.kind();
            state.append(debited, -amount, kind, posting.reference().clone());
            state.append(credited, amount, kind, posting.reference().clone());
            written += 2;
        }
        Ok(written)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Current balance of a user (zero if the account does not exist).
    #[must_use]
    pub fn balance(&self, user: &UserId) -> Decimal {
        self.state.lock().balance_of(&LedgerAccount::User(user.clone()))
    }

    /// Funds currently reserved against a market.
    #[must_use]
    pub fn escrow_balance(&self, market: &MarketId) -> Decimal {
        self.state.lock().balance_of(&LedgerAccount::Escrow(market.clone()))
    }

    #[must_use]
    pub fn has_account(&self, user: &UserId) -> bool {
        self.state
            .lock()
            .balances
            .contains_key(&LedgerAccount::User(user.clone()))
    }

    /// Entries touching `user`, oldest first.
    #[must_use]
    pub fn entries_for(&self, user: &UserId) -> Vec<LedgerEntry> {
        let account = LedgerAccount::User(user.clone());
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| e.account == account)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Σ user balances.
    #[must_use]
    pub fn total_user_balances(&self) -> Decimal {
        self.state
            .lock()
            .balances
            .iter()
            .filter(|(a, _)| matches!(a, LedgerAccount::User(_)))
            .map(|(_, b)| *b)
            .sum()
    }

    /// Σ market escrow, i.e. every stake placed and not yet released.
    #[must_use]
    pub fn total_escrow(&self) -> Decimal {
        self.state
            .lock()
            .balances
            .iter()
            .filter(|(a, _)| matches!(a, LedgerAccount::Escrow(_)))
            .map(|(_, b)| *b)
            .sum()
    }

    // =================================================================
    // Audit
    // =================================================================

    /// Check Σ balances + Σ escrow against deposits − withdrawals.
    pub fn verify_supply(&self) -> Result<()> {
        let state = self.state.lock();
        let actual: Decimal = state.balances.values().copied().sum();
        state.supply.verify(actual)
    }

    /// Rebuild every balance from the entry log.
    #[must_use]
    pub fn replay(&self) -> HashMap<LedgerAccount, Decimal> {
        let state = self.state.lock();
        let mut rebuilt: HashMap<LedgerAccount, Decimal> = HashMap::new();
        for entry in &state.entries {
            *rebuilt.entry(entry.account.clone()).or_insert(Decimal::ZERO) += entry.delta;
        }
        rebuilt
    }

    /// Compare cached balances with a replay of the log.
    pub fn verify_replay(&self) -> Result<()> {
        let rebuilt = self.replay();
        let state = self.state.lock();
        for (account, cached) in &state.balances {
            let replayed = rebuilt.get(account).copied().unwrap_or(Decimal::ZERO);
            if *cached != replayed {
                return Err(BacklayError::SupplyInvariantViolation {
                    reason: format!("{account}: cached {cached} != replayed {replayed}"),
                });
            }
        }
        Ok(())
    }

    /// Re-check that every entry's digest chains to its predecessor.
    pub fn verify_chain(&self) -> Result<()> {
        let state = self.state.lock();
        let mut prev = [0u8; 32];
        for entry in &state.entries {
            if entry.prev_digest != prev || entry.compute_digest() != entry.digest {
                return Err(BacklayError::LedgerChainBroken { seq: entry.seq });
            }
            prev = entry.digest;
        }
        Ok(())
    }
}

fn ensure_non_negative(amount: Decimal) -> Result<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(BacklayError::validation(format!(
            "ledger amount must not be negative, got {amount}"
        )));
    }
    Ok(())
}
