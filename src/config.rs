// Configuration - All protocol tunables in one injected struct
// Principle: no ambient constants drive behavior

use crate::types::{Balance, BlockNumber, BPS_DENOMINATOR, COIN};
use serde::{Deserialize, Serialize};

/// Complete configuration for the congress core.
///
/// Every component receives a reference to this struct instead of reading
/// module-level constants, so tests and alternate networks can tune thresholds
/// without recompiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CongressConfig {
    /// Maximum size of the active (block-producing) set
    pub max_active: usize,

    /// Maximum size of the backup (reserve) set
    pub max_backup: usize,

    /// Minimum self-margin to create or revive a validator
    pub minimal_stake: Balance,

    /// Blocks per epoch; set rotation and counter decay happen at boundaries
    pub epoch_length: BlockNumber,

    /// Blocks a withdrawn stake stays locked after unstake
    pub staking_lock_period: BlockNumber,

    /// Minimum blocks between two profit withdrawals of one validator
    pub withdraw_profit_period: BlockNumber,

    /// Cool-down between submitting and confirming a commission change
    pub percent_change_interval: BlockNumber,

    /// Blocks an admission proposal stays open for voting
    pub proposal_lasting_period: BlockNumber,

    /// Maximum byte length of a proposal detail text
    pub max_proposal_detail: usize,

    /// Maximum byte length of a validator moniker
    pub max_moniker_len: usize,

    /// Missed-block count at whose multiples pending profit is confiscated
    pub punish_threshold: u64,

    /// Missed-block count at which a validator is jailed
    pub remove_threshold: u64,

    /// Divisor of `remove_threshold` giving the per-epoch counter decay
    pub decrease_rate: u64,

    /// Share of each block reward burned, in basis points
    pub burn_rate_bps: u32,

    /// Share of each block reward sent to the foundation, in basis points
    pub foundation_rate_bps: u32,

    /// Share of the post-cut reward reserved for the backup set, in basis points
    pub backup_share_bps: u32,

    /// Foundation sink account
    pub foundation_account: crate::types::AccountId,

    /// Hard cap on the reward token supply
    pub token_supply_cap: Balance,
}

impl Default for CongressConfig {
    fn default() -> Self {
        Self {
            max_active: 21,
            max_backup: 11,
            minimal_stake: 32 * COIN,
            epoch_length: 200,
            staking_lock_period: 86_400,
            withdraw_profit_period: 28_800,
            percent_change_interval: 28_800,
            proposal_lasting_period: 100_800,
            max_proposal_detail: 3000,
            max_moniker_len: 70,
            punish_threshold: 24,
            remove_threshold: 48,
            decrease_rate: 24,
            burn_rate_bps: 0,
            foundation_rate_bps: 0,
            backup_share_bps: 1000,
            foundation_account: crate::types::AccountId::ZERO,
            token_supply_cap: 100_000_000 * COIN,
        }
    }
}

impl CongressConfig {
    /// Check internal consistency. Called once at construction of the core.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active == 0 {
            return Err(ConfigError::EmptyActiveSet);
        }
        if self.minimal_stake == 0 {
            return Err(ConfigError::ZeroMinimalStake);
        }
        let rates = u64::from(self.burn_rate_bps) + u64::from(self.foundation_rate_bps);
        if rates > u64::from(BPS_DENOMINATOR) {
            return Err(ConfigError::RatesExceedWhole);
        }
        if self.backup_share_bps > BPS_DENOMINATOR {
            return Err(ConfigError::RatesExceedWhole);
        }
        if self.punish_threshold == 0 || self.remove_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.punish_threshold > self.remove_threshold {
            return Err(ConfigError::ThresholdOrder);
        }
        if self.decrease_rate == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.epoch_length == 0 {
            return Err(ConfigError::ZeroEpochLength);
        }
        Ok(())
    }

    /// Per-epoch decay applied to missed-block counters
    pub fn counter_decay(&self) -> u64 {
        self.remove_threshold / self.decrease_rate
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Active set size must be nonzero")]
    EmptyActiveSet,

    #[error("Minimal stake must be nonzero")]
    ZeroMinimalStake,

    #[error("Rates must not exceed 100%")]
    RatesExceedWhole,

    #[error("Thresholds must be nonzero")]
    ZeroThreshold,

    #[error("Punish threshold must not exceed remove threshold")]
    ThresholdOrder,

    #[error("Epoch length must be nonzero")]
    ZeroEpochLength,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CongressConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rates_must_fit() {
        let mut config = CongressConfig::default();
        config.burn_rate_bps = 6000;
        config.foundation_rate_bps = 5000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RatesExceedWhole)
        ));
    }

    #[test]
    fn test_rate_pair_near_u32_max_rejected() {
        let mut config = CongressConfig::default();
        config.burn_rate_bps = u32::MAX;
        config.foundation_rate_bps = u32::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RatesExceedWhole)
        ));
    }

    #[test]
    fn test_threshold_order() {
        let mut config = CongressConfig::default();
        config.punish_threshold = 100;
        config.remove_threshold = 50;
        assert!(matches!(config.validate(), Err(ConfigError::ThresholdOrder)));
    }

    #[test]
    fn test_counter_decay() {
        let config = CongressConfig {
            remove_threshold: 48,
            decrease_rate: 24,
            ..Default::default()
        };
        assert_eq!(config.counter_decay(), 2);
    }
}
