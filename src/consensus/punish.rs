// Punish - Missed-block counters, profit confiscation and jailing
// Principle: discipline is gradual, decaying, and jail is terminal until re-admission

use crate::config::CongressConfig;
use crate::consensus::ranking::RankedRegistry;
use crate::contracts::proposal::ProposalRegistry;
use crate::contracts::reward::split_proportional;
use crate::contracts::staking::{StakingLedger, ValidatorStatus};
use crate::types::{AccountId, Balance, BlockNumber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// What a punishment tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunishOutcome {
    /// Counter incremented, no threshold crossed
    Counted,
    /// Counter hit a confiscation multiple; pending profit redistributed
    ProfitConfiscated,
    /// Counter reached the removal threshold; validator jailed
    Jailed,
}

/// One validator's missed-block record
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PunishRecord {
    missed: u64,
    last_missed_block: BlockNumber,
}

/// Per-validator missed-block counters.
///
/// A counter grows by one per punishment, decays each epoch for validators
/// that did not miss within that epoch, and triggers profit confiscation at
/// every `punish_threshold` multiple and jailing at `remove_threshold`.
/// Jailing clears the counter; the validator returns only through
/// re-admission and restake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PunishLedger {
    records: BTreeMap<AccountId, PunishRecord>,

    /// Confiscated profit with no eligible beneficiary
    pub forfeited: Balance,
    pub forfeited_token: Balance,
}

impl PunishLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missed_count(&self, validator: &AccountId) -> u64 {
        self.records.get(validator).map(|r| r.missed).unwrap_or(0)
    }

    pub fn tracked(&self) -> usize {
        self.records.len()
    }

    /// Record one missed block for `validator`.
    ///
    /// Punishing an already-jailed validator is rejected without effect, so
    /// repeated reports for the same removal are harmless.
    pub fn punish(
        &mut self,
        validator: AccountId,
        block: BlockNumber,
        active: &[AccountId],
        staking: &mut StakingLedger,
        ranking: &mut RankedRegistry,
        proposals: &mut ProposalRegistry,
        config: &CongressConfig,
    ) -> Result<PunishOutcome, PunishError> {
        let status = staking
            .validator(&validator)
            .ok_or(PunishError::ValidatorNotFound(validator))?
            .status;
        if status == ValidatorStatus::Jailed {
            return Err(PunishError::AlreadyJailed(validator));
        }

        let record = self.records.entry(validator).or_insert(PunishRecord {
            missed: 0,
            last_missed_block: block,
        });
        record.missed += 1;
        record.last_missed_block = block;
        let missed = record.missed;

        if missed >= config.remove_threshold {
            self.confiscate_profit(validator, active, staking)?;
            self.records.remove(&validator);

            if let Some(record) = staking.validator_mut(&validator) {
                record.status = ValidatorStatus::Jailed;
            }
            if ranking.contains(&validator) {
                ranking.remove(&validator)?;
            }
            proposals.revoke(&validator);

            warn!(val = %validator, missed, "validator jailed");
            return Ok(PunishOutcome::Jailed);
        }

        if missed % config.punish_threshold == 0 {
            self.confiscate_profit(validator, active, staking)?;
            info!(val = %validator, missed, "pending profit confiscated");
            return Ok(PunishOutcome::ProfitConfiscated);
        }

        Ok(PunishOutcome::Counted)
    }

    /// Apply the per-epoch decay, dropping entries that reach zero.
    /// Validators that missed at or after `epoch_start` sat out no full
    /// epoch and keep their counter.
    pub fn decay_counters(&mut self, epoch_start: BlockNumber, config: &CongressConfig) {
        let decay = config.counter_decay();
        if decay == 0 {
            return;
        }
        self.records.retain(|_, record| {
            if record.last_missed_block >= epoch_start {
                return true;
            }
            record.missed = record.missed.saturating_sub(decay);
            record.missed > 0
        });
    }

    /// Forget a validator's counter. Called when a jailed or exited
    /// validator successfully restakes.
    pub fn clear_record(&mut self, validator: &AccountId) {
        self.records.remove(validator);
    }

    /// Strip the punished validator's pending profit and redistribute it
    /// stake-proportionally over the other active, non-jailed validators.
    /// With no beneficiary the profit is forfeited.
    fn confiscate_profit(
        &mut self,
        validator: AccountId,
        active: &[AccountId],
        staking: &mut StakingLedger,
    ) -> Result<(), PunishError> {
        let (native, token) = match staking.validator_mut(&validator) {
            Some(record) => {
                let amounts = (record.pending_profit, record.pending_token_profit);
                record.pending_profit = 0;
                record.pending_token_profit = 0;
                amounts
            }
            None => (0, 0),
        };
        if native == 0 && token == 0 {
            return Ok(());
        }

        let beneficiaries: Vec<(AccountId, Balance)> = active
            .iter()
            .filter(|id| **id != validator)
            .filter_map(|id| {
                let record = staking.validator(id)?;
                if record.status == ValidatorStatus::Jailed {
                    return None;
                }
                Some((*id, record.total_stake))
            })
            .collect();

        if beneficiaries.is_empty() {
            self.forfeited += native;
            self.forfeited_token += token;
            return Ok(());
        }

        for (member, share) in split_proportional(native, &beneficiaries)
            .map_err(|_| PunishError::Redistribution)?
        {
            if let Some(record) = staking.validator_mut(&member) {
                record.pending_profit += share;
            }
        }
        for (member, share) in split_proportional(token, &beneficiaries)
            .map_err(|_| PunishError::Redistribution)?
        {
            if let Some(record) = staking.validator_mut(&member) {
                record.pending_token_profit += share;
            }
        }
        Ok(())
    }
}

/// Punishment errors
#[derive(Debug, thiserror::Error)]
pub enum PunishError {
    #[error("Validator {0} not found")]
    ValidatorNotFound(AccountId),

    #[error("Validator {0} is already jailed")]
    AlreadyJailed(AccountId),

    #[error("Confiscated profit could not be redistributed")]
    Redistribution,

    #[error("Ranking error: {0}")]
    Ranking(#[from] crate::consensus::ranking::RankingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(n: u8) -> AccountId {
        AccountId::from_bytes([n; 32])
    }

    struct Harness {
        config: CongressConfig,
        staking: StakingLedger,
        ranking: RankedRegistry,
        proposals: ProposalRegistry,
        punish: PunishLedger,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                config: CongressConfig::default(),
                staking: StakingLedger::new(),
                ranking: RankedRegistry::new(),
                proposals: ProposalRegistry::new(),
                punish: PunishLedger::new(),
            }
        }

        fn add_validator(&mut self, who: AccountId, stake: Balance) {
            self.proposals.grant(who);
            self.staking
                .stake(
                    who,
                    who,
                    None,
                    stake,
                    &self.config,
                    &self.proposals,
                    &mut self.ranking,
                )
                .unwrap();
        }

        fn punish(
            &mut self,
            validator: AccountId,
            block: BlockNumber,
            active: &[AccountId],
        ) -> Result<PunishOutcome, PunishError> {
            self.punish.punish(
                validator,
                block,
                active,
                &mut self.staking,
                &mut self.ranking,
                &mut self.proposals,
                &self.config,
            )
        }
    }

    #[test]
    fn test_counter_increments() {
        let mut h = Harness::new();
        let min = h.config.minimal_stake;
        h.add_validator(acct(1), min);

        assert_eq!(h.punish(acct(1), 1, &[acct(1)]).unwrap(), PunishOutcome::Counted);
        assert_eq!(h.punish(acct(1), 1, &[acct(1)]).unwrap(), PunishOutcome::Counted);
        assert_eq!(h.punish.missed_count(&acct(1)), 2);
    }

    #[test]
    fn test_confiscation_at_threshold_redistributes() {
        let mut h = Harness::new();
        h.config.punish_threshold = 5;
        h.config.remove_threshold = 48;
        let min = h.config.minimal_stake;
        h.add_validator(acct(1), min);
        h.add_validator(acct(2), min);
        h.add_validator(acct(3), min);
        let active = [acct(1), acct(2), acct(3)];

        h.staking.validator_mut(&acct(1)).unwrap().pending_profit = 90;

        for _ in 0..4 {
            assert_eq!(h.punish(acct(1), 1, &active).unwrap(), PunishOutcome::Counted);
        }
        assert_eq!(
            h.punish(acct(1), 1, &active).unwrap(),
            PunishOutcome::ProfitConfiscated
        );

        assert_eq!(h.staking.validator(&acct(1)).unwrap().pending_profit, 0);
        assert_eq!(h.staking.validator(&acct(2)).unwrap().pending_profit, 45);
        assert_eq!(h.staking.validator(&acct(3)).unwrap().pending_profit, 45);
    }

    #[test]
    fn test_confiscation_with_no_beneficiary_forfeits() {
        let mut h = Harness::new();
        h.config.punish_threshold = 1;
        let min = h.config.minimal_stake;
        h.add_validator(acct(1), min);
        h.staking.validator_mut(&acct(1)).unwrap().pending_profit = 50;

        h.punish(acct(1), 1, &[acct(1)]).unwrap();
        assert_eq!(h.punish.forfeited, 50);
        assert_eq!(h.staking.validator(&acct(1)).unwrap().pending_profit, 0);
    }

    #[test]
    fn test_jailed_at_remove_threshold() {
        let mut h = Harness::new();
        h.config.punish_threshold = 2;
        h.config.remove_threshold = 4;
        let min = h.config.minimal_stake;
        h.add_validator(acct(1), min);
        h.add_validator(acct(2), min);
        let active = [acct(1), acct(2)];

        for _ in 0..3 {
            h.punish(acct(1), 1, &active).unwrap();
        }
        assert_eq!(h.punish(acct(1), 1, &active).unwrap(), PunishOutcome::Jailed);

        let record = h.staking.validator(&acct(1)).unwrap();
        assert_eq!(record.status, ValidatorStatus::Jailed);
        assert!(!h.ranking.contains(&acct(1)));
        assert!(!h.proposals.has_standing(&acct(1)));
        // Counter cleared on jail
        assert_eq!(h.punish.missed_count(&acct(1)), 0);
    }

    #[test]
    fn test_punishing_jailed_validator_rejected() {
        let mut h = Harness::new();
        h.config.punish_threshold = 1;
        h.config.remove_threshold = 1;
        let min = h.config.minimal_stake;
        h.add_validator(acct(1), min);
        h.add_validator(acct(2), min);
        let active = [acct(1), acct(2)];

        assert_eq!(h.punish(acct(1), 1, &active).unwrap(), PunishOutcome::Jailed);
        assert!(matches!(
            h.punish(acct(1), 1, &active),
            Err(PunishError::AlreadyJailed(_))
        ));
        assert_eq!(h.punish.missed_count(&acct(1)), 0);
    }

    #[test]
    fn test_decay_floors_at_zero_and_drops_entry() {
        let mut h = Harness::new();
        h.config.remove_threshold = 48;
        h.config.decrease_rate = 24; // decay of 2 per epoch
        let min = h.config.minimal_stake;
        h.add_validator(acct(1), min);
        h.add_validator(acct(2), min);
        let active = [acct(1), acct(2)];

        for _ in 0..3 {
            h.punish(acct(1), 1, &active).unwrap();
        }
        h.punish(acct(2), 1, &active).unwrap();

        // Misses happened in the epoch ending before block 200
        h.punish.decay_counters(200, &h.config);
        assert_eq!(h.punish.missed_count(&acct(1)), 1);
        // Floors at zero instead of underflowing, entry dropped
        assert_eq!(h.punish.missed_count(&acct(2)), 0);
        assert_eq!(h.punish.tracked(), 1);

        h.punish.decay_counters(400, &h.config);
        assert_eq!(h.punish.tracked(), 0);
    }

    #[test]
    fn test_decay_skips_validators_that_missed_this_epoch() {
        let mut h = Harness::new();
        h.config.remove_threshold = 48;
        h.config.decrease_rate = 24;
        let min = h.config.minimal_stake;
        h.add_validator(acct(1), min);

        h.punish(acct(1), 250, &[acct(1)]).unwrap();
        h.punish(acct(1), 260, &[acct(1)]).unwrap();

        // Last miss at block 260 falls inside the epoch starting at 200
        h.punish.decay_counters(200, &h.config);
        assert_eq!(h.punish.missed_count(&acct(1)), 2);

        h.punish.decay_counters(400, &h.config);
        assert_eq!(h.punish.missed_count(&acct(1)), 0);
    }

    #[test]
    fn test_clear_record() {
        let mut h = Harness::new();
        let min = h.config.minimal_stake;
        h.add_validator(acct(1), min);

        h.punish(acct(1), 1, &[acct(1)]).unwrap();
        assert_eq!(h.punish.missed_count(&acct(1)), 1);
        h.punish.clear_record(&acct(1));
        assert_eq!(h.punish.missed_count(&acct(1)), 0);
    }

    #[test]
    fn test_unknown_validator_rejected() {
        let mut h = Harness::new();
        assert!(matches!(
            h.punish(acct(9), 1, &[]),
            Err(PunishError::ValidatorNotFound(_))
        ));
    }
}
