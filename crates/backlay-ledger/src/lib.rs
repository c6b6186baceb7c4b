//! # backlay-ledger
//!
//! The account ledger. Every change to a user balance or a market escrow
//! goes through [`AccountLedger`], which serializes mutations, applies
//! posting batches all-or-nothing, and keeps an append-only hash-chained
//! entry log that can be replayed and audited.
//!
//! [`SupplyConservation`] tracks funds entering and leaving the system so
//! the ledger can prove no value was created or destroyed in between.

pub mod account_ledger;
pub mod supply_conservation;

pub use account_ledger::AccountLedger;
pub use supply_conservation::SupplyConservation;
