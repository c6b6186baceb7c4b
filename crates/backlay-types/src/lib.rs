//! # backlay-types
//!
//! Shared types, errors, and configuration for the **Backlay** exchange.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`WagerId`], [`MatchId`], [`UserId`], [`MarketId`], [`BookKey`]
//! - **Wager model**: [`Wager`], [`Side`], [`WagerStatus`]
//! - **Match model**: [`MatchRecord`]
//! - **Market model**: [`Market`], [`Runner`], [`MarketStatus`]
//! - **Ledger model**: [`LedgerEntry`], [`LedgerAccount`], [`Posting`], [`EntryKind`], [`EntryRef`]
//! - **Configuration**: [`EngineConfig`], [`LoggingConfig`]
//! - **Errors**: [`BacklayError`] with `BX_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod market;
pub mod match_record;
pub mod wager;

pub use config::*;
pub use error::*;
pub use ids::*;
pub use ledger::*;
pub use market::*;
pub use match_record::*;
pub use wager::*;

// Constants are accessed via `backlay_types::constants::FOO`
// (not re-exported to avoid name collisions).
