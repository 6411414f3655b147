// Staking - Flat ledger of validator records and per-(staker, validator) deposits
// Principle: one source of truth for ranking weight

use crate::config::CongressConfig;
use crate::consensus::ranking::{RankedRegistry, RankingError, ValidatorClass};
use crate::contracts::proposal::ProposalRegistry;
use crate::types::{AccountId, Balance, BlockNumber, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Lifecycle status of a validator record.
///
/// Records are never deleted; a leaving validator parks in `Unstaked` or
/// `Jailed` and is revived through a fresh admission pass plus a qualifying
/// restake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorStatus {
    /// Record created by the first qualifying self-stake
    Created,
    /// Has received stake beyond creation
    Staked,
    /// Owner margin exited, withdrawal lock running
    Unstaking,
    /// Fully exited; restake requires re-admission
    Unstaked,
    /// Removed for repeated misbehavior; restake requires re-admission
    Jailed,
}

impl ValidatorStatus {
    /// Statuses in which the validator accepts top-ups from any staker
    pub fn accepts_stake(&self) -> bool {
        matches!(self, ValidatorStatus::Created | ValidatorStatus::Staked)
    }

    /// Statuses from which a re-admitted owner may restake
    pub fn allows_restake(&self) -> bool {
        matches!(self, ValidatorStatus::Unstaked | ValidatorStatus::Jailed)
    }
}

/// Pending commission change, applied only after the cool-down elapses
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PendingPercent {
    pub percent_bps: u32,
    pub submitted_at: BlockNumber,
}

/// Validator profile and accounting record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorRecord {
    /// Owner account; its deposits are the self-margin
    pub owner: AccountId,

    /// Reward recipient for profit withdrawal
    pub fee_addr: AccountId,

    /// Account allowed to manage fee/commission settings
    pub manager: AccountId,

    /// Display name, length-capped
    pub moniker: String,

    pub status: ValidatorStatus,

    /// Which set this validator competes for
    pub class: ValidatorClass,

    /// Aggregate stake across all stakers; the ranking weight
    pub total_stake: Balance,

    /// Owner's own share of the aggregate stake
    pub self_margin: Balance,

    /// Commission in basis points
    pub percent_bps: u32,

    /// Two-phase commission change awaiting confirmation
    pub pending_percent: Option<PendingPercent>,

    /// Accrued native block-reward profit
    pub pending_profit: Balance,

    /// Accrued reward-token profit mirroring the native profit
    pub pending_token_profit: Balance,

    /// Last block a profit withdrawal succeeded
    pub last_withdraw_profit_block: BlockNumber,

    /// Ordered staker list; indexed by StakeRecord::index
    pub stakers: Vec<AccountId>,
}

impl ValidatorRecord {
    fn new(owner: AccountId, fee_addr: AccountId, moniker: String, class: ValidatorClass) -> Self {
        Self {
            owner,
            fee_addr,
            manager: owner,
            moniker,
            status: ValidatorStatus::Created,
            class,
            total_stake: 0,
            self_margin: 0,
            percent_bps: BPS_DENOMINATOR,
            pending_percent: None,
            pending_profit: 0,
            pending_token_profit: 0,
            last_withdraw_profit_block: 0,
            stakers: Vec::new(),
        }
    }
}

/// One deposit of one staker into one validator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeRecord {
    pub staker: AccountId,
    pub validator: AccountId,
    pub amount: Balance,

    /// Set when the staker unstakes; starts the lock timer
    pub unstake_block: Option<BlockNumber>,

    /// Position in the validator's staker list, for O(1) swap-with-last removal
    pub index: usize,
}

/// Profile fields supplied when creating a validator record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeInfo {
    pub fee_addr: AccountId,
    pub moniker: String,
    pub class: ValidatorClass,
}

/// What a successful `stake` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeEvent {
    /// New validator record created
    Created,
    /// Top-up of an existing active validator
    Added,
    /// Re-admitted validator revived from Unstaked/Jailed
    Restaked,
}

/// Flat staking ledger: all validator records and all stake records,
/// keyed centrally instead of per-validator satellite state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StakingLedger {
    validators: BTreeMap<AccountId, ValidatorRecord>,
    stakes: BTreeMap<(AccountId, AccountId), StakeRecord>,
}

impl StakingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed genesis validators: zero-stake `Created` records with standing
    /// granted elsewhere. They rank only once they stake.
    pub(crate) fn init_genesis(&mut self, genesis: &[AccountId]) {
        for owner in genesis {
            self.validators.entry(*owner).or_insert_with(|| {
                ValidatorRecord::new(*owner, *owner, String::new(), ValidatorClass::Primary)
            });
        }
    }

    /// Deposit `amount` behind `validator`.
    ///
    /// Creation and revival are self-service: they require the staker to be
    /// the validator itself, admission standing, and the minimal stake.
    /// Active validators accept any positive top-up from any staker.
    pub fn stake(
        &mut self,
        staker: AccountId,
        validator: AccountId,
        info: Option<StakeInfo>,
        amount: Balance,
        config: &CongressConfig,
        proposals: &ProposalRegistry,
        ranking: &mut RankedRegistry,
    ) -> Result<StakeEvent, StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }

        match self.validators.get(&validator).map(|r| r.status) {
            None => {
                if staker != validator {
                    return Err(StakingError::NotOwner(staker));
                }
                if !proposals.has_standing(&validator) {
                    return Err(StakingError::NotAuthorized(validator));
                }
                if amount < config.minimal_stake {
                    return Err(StakingError::StakingCoinsNotEnough);
                }

                let (fee_addr, moniker, class) = match info {
                    Some(info) => (info.fee_addr, info.moniker, info.class),
                    None => (validator, String::new(), ValidatorClass::Primary),
                };
                if fee_addr.is_zero() {
                    return Err(StakingError::InvalidFeeAddress);
                }
                if moniker.len() > config.max_moniker_len {
                    return Err(StakingError::InvalidMonikerLength);
                }

                let mut record = ValidatorRecord::new(validator, fee_addr, moniker, class);
                record.total_stake = amount;
                record.self_margin = amount;
                record.stakers.push(validator);
                self.validators.insert(validator, record);
                self.stakes.insert(
                    (validator, validator),
                    StakeRecord {
                        staker: validator,
                        validator,
                        amount,
                        unstake_block: None,
                        index: 0,
                    },
                );

                ranking.insert(validator, amount, class)?;
                info!(val = %validator, %fee_addr, staking = amount, "validator created");
                Ok(StakeEvent::Created)
            }

            Some(status) if status.allows_restake() => {
                if staker != validator {
                    return Err(StakingError::NotOwner(staker));
                }
                if !proposals.has_standing(&validator) {
                    return Err(StakingError::NotAuthorized(validator));
                }
                if amount < config.minimal_stake {
                    return Err(StakingError::StakingCoinsNotEnough);
                }
                if let Some(existing) = self.stakes.get(&(validator, validator)) {
                    // A locked prior margin must be withdrawn before reviving
                    if existing.unstake_block.is_some() {
                        return Err(StakingError::PendingUnstake);
                    }
                }

                let record = self
                    .validators
                    .get(&validator)
                    .ok_or(StakingError::ValidatorNotFound(validator))?;
                let weight = record.total_stake.saturating_add(amount);
                ranking.insert(validator, weight, record.class)?;

                self.credit_stake(staker, validator, amount);
                if let Some(record) = self.validators.get_mut(&validator) {
                    record.status = ValidatorStatus::Staked;
                }
                info!(val = %validator, restake = amount, "validator restaked");
                Ok(StakeEvent::Restaked)
            }

            Some(status) if status.accepts_stake() => {
                if let Some(existing) = self.stakes.get(&(staker, validator)) {
                    if existing.unstake_block.is_some() {
                        return Err(StakingError::PendingUnstake);
                    }
                }

                // Rank first so a rejection leaves the ledger untouched.
                // Genesis records start unranked; their first deposit links
                // them into the registry.
                let record = self
                    .validators
                    .get(&validator)
                    .ok_or(StakingError::ValidatorNotFound(validator))?;
                let weight = record.total_stake.saturating_add(amount);
                if ranking.contains(&validator) {
                    ranking.set_weight(&validator, weight)?;
                } else {
                    ranking.insert(validator, weight, record.class)?;
                }

                self.credit_stake(staker, validator, amount);
                if let Some(record) = self.validators.get_mut(&validator) {
                    record.status = ValidatorStatus::Staked;
                }
                info!(val = %validator, %staker, add_amount = amount, "stake added");
                Ok(StakeEvent::Added)
            }

            Some(_) => Err(StakingError::InvalidStatus),
        }
    }

    /// Begin withdrawing the caller's deposit: starts the lock timer and
    /// drops the stake from the ranking weight immediately.
    pub fn unstake(
        &mut self,
        staker: AccountId,
        validator: AccountId,
        block: BlockNumber,
        ranking: &mut RankedRegistry,
        proposals: &mut ProposalRegistry,
    ) -> Result<Balance, StakingError> {
        if !self.validators.contains_key(&validator) {
            return Err(StakingError::ValidatorNotFound(validator));
        }
        let record = self
            .stakes
            .get_mut(&(staker, validator))
            .ok_or(StakingError::NoStakeRecord)?;
        if record.unstake_block.is_some() {
            return Err(StakingError::AlreadyUnstaking);
        }

        record.unstake_block = Some(block);
        let amount = record.amount;
        let index = record.index;

        self.remove_staker_at(validator, index);

        let val_record = self
            .validators
            .get_mut(&validator)
            .ok_or(StakingError::ValidatorNotFound(validator))?;
        val_record.total_stake = val_record.total_stake.saturating_sub(amount);
        if staker == validator {
            val_record.self_margin = val_record.self_margin.saturating_sub(amount);
        }

        let full_exit = staker == validator || val_record.total_stake == 0;
        if full_exit && val_record.status.accepts_stake() {
            val_record.status = ValidatorStatus::Unstaking;
            let remaining = val_record.total_stake;
            if ranking.contains(&validator) {
                ranking.remove(&validator)?;
            }
            proposals.revoke(&validator);
            info!(val = %validator, remaining, "validator unstaked");
        } else if ranking.contains(&validator) {
            let weight = val_record.total_stake;
            ranking.set_weight(&validator, weight)?;
        }

        Ok(amount)
    }

    /// Release a deposit whose lock period has elapsed. Returns the exact
    /// amount unstaked; the host moves the funds.
    pub fn withdraw(
        &mut self,
        staker: AccountId,
        validator: AccountId,
        block: BlockNumber,
        config: &CongressConfig,
    ) -> Result<Balance, StakingError> {
        if !self.validators.contains_key(&validator) {
            return Err(StakingError::ValidatorNotFound(validator));
        }
        let record = self
            .stakes
            .get(&(staker, validator))
            .ok_or(StakingError::NoStakeRecord)?;
        let unstake_block = record.unstake_block.ok_or(StakingError::NotUnstaked)?;
        if block < unstake_block + config.staking_lock_period {
            return Err(StakingError::StakingLocked);
        }

        let amount = record.amount;
        self.stakes.remove(&(staker, validator));

        if staker == validator {
            if let Some(val_record) = self.validators.get_mut(&validator) {
                if val_record.status == ValidatorStatus::Unstaking {
                    val_record.status = ValidatorStatus::Unstaked;
                }
            }
        }

        info!(val = %validator, %staker, amount, "staking withdrawn");
        Ok(amount)
    }

    /// Update the reward recipient and moniker. Owner or manager only.
    pub fn edit_validator(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        fee_addr: AccountId,
        moniker: String,
        config: &CongressConfig,
    ) -> Result<(), StakingError> {
        if fee_addr.is_zero() {
            return Err(StakingError::InvalidFeeAddress);
        }
        if moniker.len() > config.max_moniker_len {
            return Err(StakingError::InvalidMonikerLength);
        }
        let record = self
            .validators
            .get_mut(&validator)
            .ok_or(StakingError::ValidatorNotFound(validator))?;
        if caller != record.owner && caller != record.manager {
            return Err(StakingError::NotManager(caller));
        }
        record.fee_addr = fee_addr;
        record.moniker = moniker;
        info!(val = %validator, %fee_addr, "validator edited");
        Ok(())
    }

    /// Delegate commission/fee management to another account. Owner only.
    pub fn set_manager(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        manager: AccountId,
    ) -> Result<(), StakingError> {
        if manager.is_zero() {
            return Err(StakingError::InvalidManagerAddress);
        }
        let record = self
            .validators
            .get_mut(&validator)
            .ok_or(StakingError::ValidatorNotFound(validator))?;
        if caller != record.owner {
            return Err(StakingError::NotOwner(caller));
        }
        record.manager = manager;
        Ok(())
    }

    /// Phase one of a commission change: record the pending percent and
    /// start the cool-down. Re-submission restarts the clock.
    pub fn submit_percent(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        percent_bps: u32,
        block: BlockNumber,
    ) -> Result<(), StakingError> {
        if percent_bps == 0 || percent_bps > BPS_DENOMINATOR {
            return Err(StakingError::InvalidPercent(percent_bps));
        }
        let record = self
            .validators
            .get_mut(&validator)
            .ok_or(StakingError::ValidatorNotFound(validator))?;
        if caller != record.manager {
            return Err(StakingError::NotManager(caller));
        }
        record.pending_percent = Some(PendingPercent {
            percent_bps,
            submitted_at: block,
        });
        info!(val = %validator, percent_bps, "commission change submitted");
        Ok(())
    }

    /// Phase two: apply the pending percent once the cool-down elapsed.
    pub fn confirm_percent(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        block: BlockNumber,
        config: &CongressConfig,
    ) -> Result<u32, StakingError> {
        let record = self
            .validators
            .get_mut(&validator)
            .ok_or(StakingError::ValidatorNotFound(validator))?;
        if caller != record.manager {
            return Err(StakingError::NotManager(caller));
        }
        let pending = record
            .pending_percent
            .ok_or(StakingError::NoPendingPercent)?;
        if block < pending.submitted_at + config.percent_change_interval {
            return Err(StakingError::PercentChangeLocked);
        }
        record.percent_bps = pending.percent_bps;
        record.pending_percent = None;
        info!(val = %validator, percent_bps = pending.percent_bps, "commission change confirmed");
        Ok(pending.percent_bps)
    }

    pub fn validator(&self, id: &AccountId) -> Option<&ValidatorRecord> {
        self.validators.get(id)
    }

    pub(crate) fn validator_mut(&mut self, id: &AccountId) -> Option<&mut ValidatorRecord> {
        self.validators.get_mut(id)
    }

    pub fn stake_record(&self, staker: &AccountId, validator: &AccountId) -> Option<&StakeRecord> {
        self.stakes.get(&(*staker, *validator))
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Add `amount` for `staker`, creating or extending its stake record
    fn credit_stake(&mut self, staker: AccountId, validator: AccountId, amount: Balance) {
        if let Some(record) = self.validators.get_mut(&validator) {
            record.total_stake = record.total_stake.saturating_add(amount);
            if staker == validator {
                record.self_margin = record.self_margin.saturating_add(amount);
            }

            match self.stakes.get_mut(&(staker, validator)) {
                Some(stake) => stake.amount = stake.amount.saturating_add(amount),
                None => {
                    let index = record.stakers.len();
                    record.stakers.push(staker);
                    self.stakes.insert(
                        (staker, validator),
                        StakeRecord {
                            staker,
                            validator,
                            amount,
                            unstake_block: None,
                            index,
                        },
                    );
                }
            }
        }
    }

    /// Swap-with-last removal from the staker list, fixing the moved
    /// staker's record index
    fn remove_staker_at(&mut self, validator: AccountId, index: usize) {
        let moved = if let Some(record) = self.validators.get_mut(&validator) {
            record.stakers.swap_remove(index);
            record.stakers.get(index).copied()
        } else {
            None
        };
        if let Some(moved) = moved {
            if let Some(stake) = self.stakes.get_mut(&(moved, validator)) {
                stake.index = index;
            }
        }
    }
}

/// Staking errors
#[derive(Debug, thiserror::Error)]
pub enum StakingError {
    #[error("You must be authorized first: {0}")]
    NotAuthorized(AccountId),

    #[error("Caller {0} is not the validator owner")]
    NotOwner(AccountId),

    #[error("Caller {0} is not the validator manager")]
    NotManager(AccountId),

    #[error("Staking coins not enough")]
    StakingCoinsNotEnough,

    #[error("Stake amount must be nonzero")]
    ZeroAmount,

    #[error("Invalid fee address")]
    InvalidFeeAddress,

    #[error("Invalid manager address")]
    InvalidManagerAddress,

    #[error("Invalid moniker length")]
    InvalidMonikerLength,

    #[error("Invalid commission percent: {0}")]
    InvalidPercent(u32),

    #[error("Invalid status for this operation")]
    InvalidStatus,

    #[error("A prior unstake is pending withdrawal")]
    PendingUnstake,

    #[error("Validator {0} not found")]
    ValidatorNotFound(AccountId),

    #[error("No stake record to act on")]
    NoStakeRecord,

    #[error("Stake is already unstaking")]
    AlreadyUnstaking,

    #[error("Stake has not been unstaked")]
    NotUnstaked,

    #[error("Your staking hasn't unlocked yet")]
    StakingLocked,

    #[error("No pending commission change")]
    NoPendingPercent,

    #[error("Commission change interval not elapsed")]
    PercentChangeLocked,

    #[error("Ranking error: {0}")]
    Ranking(#[from] RankingError),
}
