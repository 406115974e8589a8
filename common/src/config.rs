// Ratio denominators used by the chain economics
// Slash fractions and delegation reward ratios are expressed in basis points
pub const BASIS_POINTS: u64 = 10_000;
// Duplicate sign report rewards are expressed in percent
pub const PERCENT: u64 = 100;

// Default gas limits
pub const TRANSFER_GAS: u64 = 21_000;
pub const RESTRICTING_GAS: u64 = 100_000;
pub const GOVERN_GAS_PRICE: u128 = 2_100_000_000_000_000;

// Seconds allowed per outstanding block when waiting for a block height
pub const BLOCK_WAIT_SECONDS_PER_BLOCK: u64 = 3;
