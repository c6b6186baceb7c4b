//! System-wide constants for the Backlay exchange.

use rust_decimal::Decimal;

/// Maximum decimal places accepted on a requested or exit price.
pub const PRICE_PRECISION: u32 = 2;

/// Maximum decimal places accepted on a stake.
pub const STAKE_PRECISION: u32 = 2;

/// Decimal places kept on computed money amounts (cash-out values).
pub const MONEY_PRECISION: u32 = 8;

/// Highest decimal odds a wager may request.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Largest stake a single wager may carry.
pub const MAX_STAKE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Ceiling on `max_stake × max_price`, the largest reservation one wager can
/// make. Leaves headroom so sums of exposures stay far inside `Decimal`.
pub const MAX_EXPOSURE: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Decimal odds must be strictly greater than this.
pub const MIN_PRICE_EXCLUSIVE: Decimal = Decimal::ONE;

/// Default account that funds cash-outs and inherits their settlement claims.
pub const DEFAULT_HOUSE_ACCOUNT: &str = "house";

/// Default number of wagers per bet-history page.
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 50;

/// Domain separator for ledger entry digests.
pub const LEDGER_DIGEST_DOMAIN: &[u8] = b"backlay:ledger_entry:v1:";
