use thiserror::Error;

/// Errors raised by the economic model (genesis parsing, period arithmetic, reward formulas)
///
/// Every failure of the pure arithmetic is reported through this type so callers
/// never have to guard against panics on division or overflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EconomicError {
    /// The genesis snapshot would produce an empty period
    #[error("Invalid genesis economic config: {0}")]
    InvalidGenesis(&'static str),

    /// Economic config JSON returned by the node could not be parsed
    #[error("Failed to parse economic config: {0}")]
    GenesisParse(String),

    #[error("Unknown period type '{0}', expected one of: round, consensus, epoch, issuance")]
    UnknownPeriodType(String),

    /// Period indexes are 1-based
    #[error("Invalid period index {0}, period indexes start at 1")]
    InvalidPeriodIndex(u64),

    #[error("Division by zero: {0} must be positive")]
    DivisionByZero(&'static str),

    /// A ratio is outside of its denominator range
    #[error("Invalid {name}: {value}, maximum is {max}")]
    InvalidRatio {
        name: &'static str,
        value: u64,
        max: u64,
    },

    /// A single delegation cannot be larger than the node total
    #[error("Delegation amount {amount} exceeds the node delegation total {total}")]
    InvalidDelegation { amount: u128, total: u128 },

    #[error("Arithmetic overflow while computing {0}")]
    Overflow(&'static str),
}
