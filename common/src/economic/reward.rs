//! Reward and slashing formulas
//!
//! Every division truncates toward zero in a fixed order, the same order the
//! chain uses when paying rewards. Intermediate products are computed on 256 bits
//! so no precision is lost before the final division.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::config::{BASIS_POINTS, PERCENT};

use super::EconomicError;

fn to_u128(value: U256, what: &'static str) -> Result<u128, EconomicError> {
    if value.bits() > 128 {
        return Err(EconomicError::Overflow(what));
    }
    Ok(value.low_u128())
}

fn check_ratio(name: &'static str, value: u64, max: u64) -> Result<(), EconomicError> {
    if value > max {
        return Err(EconomicError::InvalidRatio { name, value, max });
    }
    Ok(())
}

// floor(a * b / d)
fn mul_div(a: u128, b: u128, d: u128, what: &'static str) -> Result<u128, EconomicError> {
    if d == 0 {
        return Err(EconomicError::DivisionByZero(what));
    }
    to_u128(U256::from(a) * U256::from(b) / U256::from(d), what)
}

/// Reward earned by a node over one settlement epoch, transaction fees excluded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReward {
    pub staking_reward: u128,
    pub block_reward: u128,
}

impl NodeReward {
    pub fn total(&self) -> u128 {
        // Both components are bounded when built by calc_node_reward
        self.staking_reward.saturating_add(self.block_reward)
    }
}

/// Staking share plus block production reward of a node for one epoch
pub fn calc_node_reward(
    epoch_staking_reward: u128,
    verifier_count: u64,
    epoch_block_reward: u128,
    block_count: u64,
) -> Result<NodeReward, EconomicError> {
    if verifier_count == 0 {
        return Err(EconomicError::DivisionByZero("verifier count"));
    }

    let staking_reward = epoch_staking_reward / verifier_count as u128;
    let block_reward = to_u128(
        U256::from(epoch_block_reward) * U256::from(block_count),
        "block reward",
    )?;
    staking_reward
        .checked_add(block_reward)
        .ok_or(EconomicError::Overflow("node reward"))?;

    Ok(NodeReward {
        staking_reward,
        block_reward,
    })
}

/// Part of a node epoch reward paid into its delegation pool
///
/// `reward_ratio` is expressed in basis points.
pub fn calc_delegate_pool_reward(
    epoch_staking_reward: u128,
    verifier_count: u64,
    epoch_block_reward: u128,
    block_count: u64,
    reward_ratio: u64,
) -> Result<u128, EconomicError> {
    if verifier_count == 0 {
        return Err(EconomicError::DivisionByZero("verifier count"));
    }
    check_ratio("delegate reward ratio", reward_ratio, BASIS_POINTS)?;

    let node_staking_reward = epoch_staking_reward / verifier_count as u128;
    let staking_part = mul_div(
        node_staking_reward,
        reward_ratio as u128,
        BASIS_POINTS as u128,
        "delegate staking reward",
    )?;

    let block_part = to_u128(
        U256::from(epoch_block_reward) * U256::from(reward_ratio) * U256::from(block_count)
            / U256::from(BASIS_POINTS),
        "delegate block reward",
    )?;

    staking_part
        .checked_add(block_part)
        .ok_or(EconomicError::Overflow("delegate pool reward"))
}

/// Individual delegator share of a delegation pool
pub fn calc_delegate_share(
    pool_reward: u128,
    delegate_total_amount: u128,
    delegate_amount: u128,
) -> Result<u128, EconomicError> {
    if delegate_total_amount == 0 {
        return Err(EconomicError::DivisionByZero("delegate total amount"));
    }
    if delegate_amount > delegate_total_amount {
        return Err(EconomicError::InvalidDelegation {
            amount: delegate_amount,
            total: delegate_total_amount,
        });
    }

    // Never above pool_reward since delegate_amount <= delegate_total_amount
    mul_div(
        pool_reward,
        delegate_amount,
        delegate_total_amount,
        "delegate share",
    )
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateReward {
    pub pool_reward: u128,
    pub share: u128,
}

/// Delegation pool of a node and the share owed to one delegator
pub fn calc_delegate_reward(
    total_node_reward: u128,
    reward_ratio: u64,
    delegate_total_amount: u128,
    delegate_amount: u128,
) -> Result<DelegateReward, EconomicError> {
    check_ratio("delegate reward ratio", reward_ratio, BASIS_POINTS)?;

    let pool_reward = mul_div(
        total_node_reward,
        reward_ratio as u128,
        BASIS_POINTS as u128,
        "delegate pool reward",
    )?;
    let share = calc_delegate_share(pool_reward, delegate_total_amount, delegate_amount)?;

    Ok(DelegateReward { pool_reward, share })
}

/// Outcome of a duplicate signature report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingSplit {
    pub slashing_amount: u128,
    pub reporter_reward: u128,
    pub to_incentive_pool: u128,
}

/// Split a duplicate signature slashing between the reporter and the incentive pool
///
/// `slash_fraction` is in basis points of the stake, `report_reward_ratio` in percent
/// of the slashed amount.
pub fn calc_multi_sign_slashing(
    staking_amount: u128,
    slash_fraction: u64,
    report_reward_ratio: u64,
) -> Result<SlashingSplit, EconomicError> {
    check_ratio("slash fraction", slash_fraction, BASIS_POINTS)?;
    check_ratio("report reward ratio", report_reward_ratio, PERCENT)?;

    let slashing_amount = mul_div(
        staking_amount,
        slash_fraction as u128,
        BASIS_POINTS as u128,
        "slashing amount",
    )?;
    let reporter_reward = mul_div(
        slashing_amount,
        report_reward_ratio as u128,
        PERCENT as u128,
        "reporter reward",
    )?;

    Ok(SlashingSplit {
        slashing_amount,
        reporter_reward,
        to_incentive_pool: slashing_amount - reporter_reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_reward() {
        let reward = calc_node_reward(1_000, 3, 7, 10).unwrap();
        assert_eq!(reward.staking_reward, 333);
        assert_eq!(reward.block_reward, 70);
        assert_eq!(reward.total(), 403);
    }

    #[test]
    fn test_node_reward_zero_verifiers() {
        assert_eq!(
            calc_node_reward(1_000, 0, 7, 10),
            Err(EconomicError::DivisionByZero("verifier count"))
        );
    }

    #[test]
    fn test_delegate_reward_full_share() {
        let reward = calc_delegate_reward(1_000, 5_000, 100, 100).unwrap();
        assert_eq!(reward.pool_reward, 500);
        assert_eq!(reward.share, 500);
    }

    #[test]
    fn test_delegate_reward_truncates() {
        // floor(999 * 0.3333) = 332, then floor(332 * 3 / 10)
        let reward = calc_delegate_reward(999, 3_333, 10, 3).unwrap();
        assert_eq!(reward.pool_reward, 332);
        assert_eq!(reward.share, 99);
    }

    #[test]
    fn test_delegate_pool_reward_truncation_order() {
        // floor(floor(1000 / 3) * 5000 / 10000) + floor(7 * 5000 * 3 / 10000)
        assert_eq!(calc_delegate_pool_reward(1_000, 3, 7, 3, 5_000).unwrap(), 166 + 10);
    }

    #[test]
    fn test_delegate_share_rejects_invalid_amounts() {
        assert_eq!(
            calc_delegate_share(500, 0, 0),
            Err(EconomicError::DivisionByZero("delegate total amount"))
        );
        assert_eq!(
            calc_delegate_share(500, 100, 101),
            Err(EconomicError::InvalidDelegation {
                amount: 101,
                total: 100
            })
        );
    }

    #[test]
    fn test_multi_sign_slashing() {
        let split = calc_multi_sign_slashing(100_000, 1_000, 50).unwrap();
        assert_eq!(split.slashing_amount, 10_000);
        assert_eq!(split.reporter_reward, 5_000);
        assert_eq!(split.to_incentive_pool, 5_000);
    }

    #[test]
    fn test_multi_sign_slashing_rejects_ratios() {
        assert!(matches!(
            calc_multi_sign_slashing(100_000, 10_001, 50),
            Err(EconomicError::InvalidRatio { .. })
        ));
        assert!(matches!(
            calc_multi_sign_slashing(100_000, 1_000, 101),
            Err(EconomicError::InvalidRatio { .. })
        ));
    }

    #[test]
    fn test_large_amounts_do_not_overflow() {
        let stake = 10u128.pow(30);
        let split = calc_multi_sign_slashing(stake, 10_000, 100).unwrap();
        assert_eq!(split.slashing_amount, stake);
        assert_eq!(split.to_incentive_pool, 0);

        assert_eq!(
            calc_node_reward(0, 1, u128::MAX, 2),
            Err(EconomicError::Overflow("block reward"))
        );
    }
}
