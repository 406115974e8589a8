mod error;
mod genesis;
mod period;
mod reward;

pub use error::EconomicError;
pub use genesis::{
    ChainParams, GenesisEconomicConfig, GovernParams, RestrictingParams, RewardParams,
    SlashingParams, StakingParams,
};
pub use period::{EconomicPeriods, PeriodDescriptor, PeriodIndexPolicy, PeriodType};
pub use reward::{
    calc_delegate_pool_reward, calc_delegate_reward, calc_delegate_share,
    calc_multi_sign_slashing, calc_node_reward, DelegateReward, NodeReward, SlashingSplit,
};
