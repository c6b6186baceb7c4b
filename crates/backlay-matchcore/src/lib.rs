//! # backlay-matchcore
//!
//! **Order books and price-time matching for Backlay.**
//!
//! - [`RunnerBook`]: both sides of one (market, runner) book, plus the state
//!   of every wager placed on it
//! - [`BookRegistry`]: runner books partitioned behind their own locks
//! - [`plan_fills`] / [`apply_plan`]: the matcher, split so the caller can
//!   fund the fills between planning and applying
//! - [`MatchRecordLedger`]: append-only record of every pairing
//! - [`MarketCatalog`]: market reference data and the status gate
//!
//! Nothing here touches balances.

pub mod catalog;
pub mod match_log;
pub mod matcher;
pub mod orderbook;
pub mod price_level;
pub mod registry;

pub use catalog::MarketCatalog;
pub use match_log::MatchRecordLedger;
pub use matcher::{Fill, FillPlan, apply_plan, plan_fills};
pub use orderbook::{LadderRung, RunnerBook};
pub use price_level::PriceLevel;
pub use registry::{BookHandle, BookRegistry};
