//! # backlay-settlement
//!
//! Terminal transitions of wagers.
//!
//! - [`SettlementProcessor`] resolves a market once: each match record's
//!   pool goes to the winning side, unmatched stake is refunded, and a
//!   [`SettlementReceipt`] is written to the [`SettlementJournal`]
//! - [`CashOutDesk`] lets an owner exit a matched position early; the house
//!   account pays the exit value and inherits the position's claim
//!
//! Both build the full set of ledger postings first and hand them to the
//! account ledger as one batch, so a rejection never leaves partial effects.

pub mod cash_out;
pub mod journal;
pub mod processor;

pub use cash_out::{CashOutDesk, CashOutReceipt, cash_out_value};
pub use journal::{SettlementJournal, SettlementReceipt};
pub use processor::SettlementProcessor;
