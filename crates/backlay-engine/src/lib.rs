//! # backlay-engine
//!
//! **Back/lay wagering exchange.**
//!
//! [`Exchange`] is the entry point. It accepts placements from
//! authenticated users, matches them with strict price-time priority,
//! settles markets once, and lets owners cash out matched positions early.
//! Funds are reserved at placement and never created or destroyed: every
//! movement is an entry in the account ledger, which [`Exchange::audit`]
//! can verify at any time.
//!
//! ```text
//! place_order ──▶ AccountLedger (reserve) ──▶ RunnerBook (match)
//!                                              └──▶ MatchRecordLedger
//! settle_market ──▶ MatchRecordLedger ──▶ AccountLedger (release)
//! cash_out ──▶ house pays value, takes the position's claim
//! ```

pub mod exchange;
pub mod history;
pub mod telemetry;
pub mod validation;

pub use exchange::{Exchange, Ladder, Services};
pub use history::BetHistoryPage;
pub use telemetry::init_tracing;
pub use validation::PlacementLimits;

pub use backlay_settlement::{CashOutReceipt, SettlementReceipt};
pub use backlay_types as types;
