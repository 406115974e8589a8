use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EconomicError;

/// Von amounts above `u64::MAX`
///
/// Exact when read from JSON text. Once a node answer went through a generic JSON
/// value such amounts are floats, they are read back from their shortest decimal form.
mod amount {
    use std::fmt;

    use serde::{de, Deserializer};

    struct AmountVisitor;

    impl de::Visitor<'_> for AmountVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer amount")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u128, E> {
            Ok(value.into())
        }

        fn visit_u128<E: de::Error>(self, value: u128) -> Result<u128, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u128, E> {
            u128::try_from(value)
                .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<u128, E> {
            // Display never uses an exponent and prints the shortest round-trip digits
            value
                .to_string()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Float(value), &self))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_u128(AmountVisitor)
    }
}

/// Chain timing parameters, the only section the period hierarchy depends on
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    /// Maximum settlement epoch length, in minutes
    pub max_epoch_minutes: u64,
    /// Seconds needed by one node to produce a full round of blocks
    pub node_block_time_window: u64,
    /// Blocks produced by a single validator per round
    pub per_round_blocks: u64,
    /// Validators taking part in one consensus round
    pub max_consensus_vals: u64,
    /// Issuance cycle length, in minutes
    pub additional_cycle_time: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingParams {
    #[serde(deserialize_with = "amount::deserialize")]
    pub stake_threshold: u128,
    #[serde(deserialize_with = "amount::deserialize")]
    pub operating_threshold: u128,
    pub max_validators: u64,
    pub un_stake_freeze_duration: u64,
    pub reward_per_max_change_range: u64,
    pub reward_per_change_interval: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlashingParams {
    /// Share of the stake slashed for a duplicate signature, in basis points
    pub slash_fraction_duplicate_sign: u64,
    /// Share of the slashed amount paid to the reporter, in percent
    pub duplicate_sign_report_reward: u64,
    pub max_evidence_age: u64,
    pub slash_blocks_reward: u64,
    pub zero_produce_cumulative_time: u64,
    pub zero_produce_number_threshold: u64,
    pub zero_produce_freeze_duration: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernParams {
    pub version_proposal_vote_duration_seconds: u64,
    pub version_proposal_support_rate: u64,
    pub text_proposal_vote_duration_seconds: u64,
    pub text_proposal_vote_rate: u64,
    pub text_proposal_support_rate: u64,
    pub cancel_proposal_vote_rate: u64,
    pub cancel_proposal_support_rate: u64,
    pub param_proposal_vote_duration_seconds: u64,
    pub param_proposal_vote_rate: u64,
    pub param_proposal_support_rate: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardParams {
    pub new_block_rate: u64,
    pub platon_foundation_year: u64,
    pub increase_issuance_ratio: u64,
    #[serde(rename = "TheNumberOfDelegationsReward")]
    pub the_number_of_delegations_reward: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictingParams {
    #[serde(deserialize_with = "amount::deserialize")]
    pub minimum_release: u128,
}

/// Immutable snapshot of the chain economic configuration
///
/// Fetched once from the node and shared read-only for the lifetime of the process.
/// Only `common` is mandatory, the other sections default to zero values when a node
/// version does not report them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisEconomicConfig {
    pub common: ChainParams,
    #[serde(default)]
    pub staking: StakingParams,
    #[serde(default)]
    pub slashing: SlashingParams,
    #[serde(default)]
    pub gov: GovernParams,
    #[serde(default)]
    pub reward: RewardParams,
    #[serde(default)]
    pub restricting: RestrictingParams,
}

impl GenesisEconomicConfig {
    // Parse straight from the text so 128-bit amounts are not squeezed through f64
    pub fn from_json(json: &str) -> Result<Self, EconomicError> {
        serde_json::from_str(json).map_err(|e| EconomicError::GenesisParse(e.to_string()))
    }

    pub fn from_value(value: Value) -> Result<Self, EconomicError> {
        serde_json::from_value(value).map_err(|e| EconomicError::GenesisParse(e.to_string()))
    }
}
