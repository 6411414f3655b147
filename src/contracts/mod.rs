// Contract-layer ledgers: admission, staking, rewards, token

pub mod proposal;
pub mod reward;
pub mod staking;
pub mod token;
