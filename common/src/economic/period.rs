use std::{str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::{
    reward::{calc_multi_sign_slashing, SlashingSplit},
    EconomicError, GenesisEconomicConfig,
};

/// Nested period levels, from the shortest to the longest
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PeriodType {
    /// Blocks produced by one validator in a row
    Round,
    /// One round per consensus validator
    Consensus,
    /// Settlement epoch, rewards are pooled and paid per epoch
    Epoch,
    /// Issuance cycle, `increasing` is the legacy name
    #[serde(alias = "increasing")]
    #[strum(to_string = "issuance", serialize = "increasing")]
    Issuance,
}

impl PeriodType {
    pub fn parse(value: &str) -> Result<Self, EconomicError> {
        Self::from_str(value.trim())
            .map_err(|_| EconomicError::UnknownPeriodType(value.to_string()))
    }
}

/// Rounding rule used to map a block height to its period index
///
/// Historical tooling disagreed on the rule, so it is kept swappable.
/// `Ceiling` assigns a boundary block to the period it closes: with 160 blocks
/// per epoch, block 160 is the last block of epoch 1.
/// `FloorPlusOne` assigns it to the next period instead: block 160 reports epoch 2.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PeriodIndexPolicy {
    #[default]
    Ceiling,
    FloorPlusOne,
}

impl PeriodIndexPolicy {
    // period_blocks is never zero, EconomicPeriods rejects such genesis snapshots
    pub fn index_of(self, block_number: u64, period_blocks: u64) -> u64 {
        match self {
            Self::Ceiling => block_number.div_ceil(period_blocks).max(1),
            Self::FloorPlusOne => (block_number / period_blocks).saturating_add(1),
        }
    }
}

/// A period and its inclusive block range
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDescriptor {
    pub period_type: PeriodType,
    pub index: u64,
    pub start_block: u64,
    pub end_block: u64,
}

impl PeriodDescriptor {
    pub fn contains(&self, block_number: u64) -> bool {
        self.start_block <= block_number && block_number <= self.end_block
    }
}

fn checked_mul(a: u64, b: u64, what: &'static str) -> Result<u64, EconomicError> {
    a.checked_mul(b).ok_or(EconomicError::Overflow(what))
}

/// Period hierarchy derived from the genesis economic constants
///
/// All lengths are integer block counts and all durations integer seconds. The
/// snapshot never changes after construction so the calculator can be shared
/// behind an `Arc` without locking.
#[derive(Clone, Debug)]
pub struct EconomicPeriods {
    genesis: Arc<GenesisEconomicConfig>,
    policy: PeriodIndexPolicy,
    block_time: u64,
    round_blocks: u64,
    consensus_rounds: u64,
    epoch_consensus: u64,
    issuance_epochs: u64,
}

impl EconomicPeriods {
    pub fn new(genesis: impl Into<Arc<GenesisEconomicConfig>>) -> Result<Self, EconomicError> {
        Self::with_policy(genesis, PeriodIndexPolicy::default())
    }

    pub fn with_policy(
        genesis: impl Into<Arc<GenesisEconomicConfig>>,
        policy: PeriodIndexPolicy,
    ) -> Result<Self, EconomicError> {
        let genesis = genesis.into();
        let chain = &genesis.common;

        if chain.per_round_blocks == 0 {
            return Err(EconomicError::InvalidGenesis(
                "perRoundBlocks must be positive",
            ));
        }
        if chain.max_consensus_vals == 0 {
            return Err(EconomicError::InvalidGenesis(
                "maxConsensusVals must be positive",
            ));
        }

        let block_time = chain.node_block_time_window / chain.per_round_blocks;
        if block_time == 0 {
            return Err(EconomicError::InvalidGenesis(
                "nodeBlockTimeWindow is shorter than one second per block",
            ));
        }

        let round_blocks = chain.per_round_blocks;
        let consensus_rounds = chain.max_consensus_vals;
        let consensus_blocks = checked_mul(consensus_rounds, round_blocks, "consensus blocks")?;
        let consensus_time = checked_mul(consensus_blocks, block_time, "consensus time")?;

        let epoch_consensus =
            checked_mul(chain.max_epoch_minutes, 60, "epoch seconds")? / consensus_time;
        if epoch_consensus == 0 {
            return Err(EconomicError::InvalidGenesis(
                "maxEpochMinutes is shorter than one consensus round",
            ));
        }
        let epoch_time = checked_mul(epoch_consensus, consensus_time, "epoch time")?;

        let issuance_epochs =
            checked_mul(chain.additional_cycle_time, 60, "issuance seconds")? / epoch_time;
        if issuance_epochs == 0 {
            return Err(EconomicError::InvalidGenesis(
                "additionalCycleTime is shorter than one settlement epoch",
            ));
        }

        // Largest products of the hierarchy, every accessor below stays under them
        let issuance_consensus =
            checked_mul(issuance_epochs, epoch_consensus, "issuance consensus rounds")?;
        let issuance_rounds =
            checked_mul(issuance_consensus, consensus_rounds, "issuance rounds")?;
        checked_mul(issuance_rounds, round_blocks, "issuance blocks")?;
        checked_mul(issuance_epochs, epoch_time, "issuance time")?;

        Ok(Self {
            genesis,
            policy,
            block_time,
            round_blocks,
            consensus_rounds,
            epoch_consensus,
            issuance_epochs,
        })
    }

    pub fn genesis(&self) -> &GenesisEconomicConfig {
        &self.genesis
    }

    pub fn policy(&self) -> PeriodIndexPolicy {
        self.policy
    }

    // Block
    pub fn block_time(&self) -> u64 {
        self.block_time
    }

    // Round
    pub fn round_blocks(&self) -> u64 {
        self.round_blocks
    }

    pub fn round_time(&self) -> u64 {
        self.round_blocks * self.block_time
    }

    // Consensus round
    pub fn consensus_rounds(&self) -> u64 {
        self.consensus_rounds
    }

    pub fn consensus_blocks(&self) -> u64 {
        self.consensus_rounds * self.round_blocks
    }

    pub fn consensus_time(&self) -> u64 {
        self.consensus_rounds * self.round_time()
    }

    // Settlement epoch
    pub fn epoch_consensus(&self) -> u64 {
        self.epoch_consensus
    }

    pub fn epoch_rounds(&self) -> u64 {
        self.epoch_consensus * self.consensus_rounds
    }

    pub fn epoch_blocks(&self) -> u64 {
        self.epoch_consensus * self.consensus_blocks()
    }

    pub fn epoch_time(&self) -> u64 {
        self.epoch_consensus * self.consensus_time()
    }

    // Issuance cycle, derived top-down so every level is an exact product of the one below
    pub fn issuance_epochs(&self) -> u64 {
        self.issuance_epochs
    }

    pub fn issuance_consensus(&self) -> u64 {
        self.issuance_epochs * self.epoch_consensus
    }

    pub fn issuance_rounds(&self) -> u64 {
        self.issuance_consensus() * self.consensus_rounds
    }

    pub fn issuance_blocks(&self) -> u64 {
        self.issuance_rounds() * self.round_blocks
    }

    pub fn issuance_time(&self) -> u64 {
        self.issuance_epochs * self.epoch_time()
    }

    pub fn validator_count(&self) -> u64 {
        self.genesis.common.max_consensus_vals
    }

    // Staking thresholds
    pub fn staking_limit(&self) -> u128 {
        self.genesis.staking.stake_threshold
    }

    pub fn add_staking_limit(&self) -> u128 {
        self.genesis.staking.operating_threshold
    }

    pub fn delegate_limit(&self) -> u128 {
        self.genesis.staking.operating_threshold
    }

    /// Settlement epochs a withdrawn stake stays frozen
    pub fn unstaking_freeze_epochs(&self) -> u64 {
        self.genesis.staking.un_stake_freeze_duration
    }

    /// Block reward multiple slashed from a node that produced no block
    pub fn not_block_slash_rate(&self) -> u64 {
        self.genesis.slashing.slash_blocks_reward
    }

    // Governance voting windows, in settlement epochs
    pub fn param_proposal_epochs(&self) -> u64 {
        self.genesis.gov.param_proposal_vote_duration_seconds / self.epoch_time()
    }

    pub fn text_proposal_epochs(&self) -> u64 {
        self.genesis.gov.text_proposal_vote_duration_seconds / self.epoch_time()
    }

    pub fn version_proposal_epochs(&self) -> u64 {
        self.genesis.gov.version_proposal_vote_duration_seconds / self.epoch_time()
    }

    pub fn period_blocks(&self, period_type: PeriodType) -> u64 {
        match period_type {
            PeriodType::Round => self.round_blocks(),
            PeriodType::Consensus => self.consensus_blocks(),
            PeriodType::Epoch => self.epoch_blocks(),
            PeriodType::Issuance => self.issuance_blocks(),
        }
    }

    pub fn period_time(&self, period_type: PeriodType) -> u64 {
        match period_type {
            PeriodType::Round => self.round_time(),
            PeriodType::Consensus => self.consensus_time(),
            PeriodType::Epoch => self.epoch_time(),
            PeriodType::Issuance => self.issuance_time(),
        }
    }

    /// Period enclosing `block_number`, indexed according to the configured policy
    pub fn period_containing(
        &self,
        block_number: u64,
        period_type: PeriodType,
    ) -> Result<PeriodDescriptor, EconomicError> {
        let index = self
            .policy
            .index_of(block_number, self.period_blocks(period_type));
        self.bounds_of_period(index, period_type)
    }

    /// First and last block of the 1-based period `index`
    pub fn bounds_of_period(
        &self,
        index: u64,
        period_type: PeriodType,
    ) -> Result<PeriodDescriptor, EconomicError> {
        if index == 0 {
            return Err(EconomicError::InvalidPeriodIndex(index));
        }

        let period_blocks = self.period_blocks(period_type);
        let end_block = checked_mul(index, period_blocks, "period end block")?;
        let start_block = (index - 1) * period_blocks + 1;

        Ok(PeriodDescriptor {
            period_type,
            index,
            start_block,
            end_block,
        })
    }

    /// Reporter reward and incentive pool share for a duplicate signature report
    pub fn calc_report_multi_sign_reward(
        &self,
        staking_amount: u128,
    ) -> Result<SlashingSplit, EconomicError> {
        let slashing = &self.genesis.slashing;
        calc_multi_sign_slashing(
            staking_amount,
            slashing.slash_fraction_duplicate_sign,
            slashing.duplicate_sign_report_reward,
        )
    }
}
