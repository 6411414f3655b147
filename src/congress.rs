// Congress - Facade wiring admission, staking, ranking, rewards and discipline
// Principle: cross-module effects happen in exactly one place

use crate::config::{CongressConfig, ConfigError};
use crate::consensus::coordinator::{CoordinatorError, RotationDiff, ValidatorSetCoordinator};
use crate::consensus::epoch::EpochSchedule;
use crate::consensus::punish::{PunishError, PunishLedger, PunishOutcome};
use crate::consensus::ranking::RankedRegistry;
use crate::contracts::proposal::{ProposalError, ProposalId, ProposalOutcome, ProposalRegistry};
use crate::contracts::reward::{
    RewardBreakdown, RewardDistributor, RewardError, WithdrawnProfit,
};
use crate::contracts::staking::{
    StakeEvent, StakeInfo, StakingError, StakingLedger, ValidatorRecord,
};
use crate::contracts::token::RewardToken;
use crate::types::{AccountId, Balance, BlockNumber};
use serde::{Deserialize, Serialize};
use tracing::info;

/// The complete membership-and-incentive core.
///
/// Owns every sub-ledger and sequences their interactions: a vote that
/// passes grants staking standing, a full unstake revokes it, a jail drops
/// the validator from the ranking, a successful restake clears its
/// missed-block record. Callers drive it with host block numbers; it never
/// reads a clock of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Congress {
    config: CongressConfig,
    schedule: EpochSchedule,
    admin: AccountId,

    /// Consensus engine account; the only caller allowed to report rewards,
    /// misses and epoch ends
    engine: AccountId,
    proposals: ProposalRegistry,
    staking: StakingLedger,
    ranking: RankedRegistry,
    distributor: RewardDistributor,
    punish: PunishLedger,
    token: RewardToken,
    coordinator: ValidatorSetCoordinator,
}

impl Congress {
    /// Build a core with `genesis` as the initial active set. Genesis
    /// validators receive standing and a zero-stake record; they enter the
    /// ranking once they stake like everyone else. The engine account starts
    /// as `admin` until reassigned with [`Congress::set_engine`].
    pub fn new(
        config: CongressConfig,
        admin: AccountId,
        genesis: &[AccountId],
    ) -> Result<Self, CongressError> {
        config.validate()?;

        let schedule = EpochSchedule::new(config.epoch_length);
        let token = RewardToken::new(config.token_supply_cap);

        let mut proposals = ProposalRegistry::new();
        let mut staking = StakingLedger::new();
        let mut coordinator = ValidatorSetCoordinator::new();
        for validator in genesis {
            proposals.grant(*validator);
        }
        staking.init_genesis(genesis);
        coordinator.init_genesis(genesis);

        info!(%admin, genesis = genesis.len(), "congress initialized");
        Ok(Self {
            config,
            schedule,
            admin,
            engine: admin,
            proposals,
            staking,
            ranking: RankedRegistry::new(),
            distributor: RewardDistributor::new(),
            punish: PunishLedger::new(),
            token,
            coordinator,
        })
    }

    /// Reassign the consensus engine account. Admin only.
    pub fn set_engine(
        &mut self,
        caller: AccountId,
        engine: AccountId,
    ) -> Result<(), CongressError> {
        if caller != self.admin {
            return Err(CongressError::NotAdmin(caller));
        }
        self.engine = engine;
        info!(%engine, "consensus engine reassigned");
        Ok(())
    }

    fn ensure_engine(&self, caller: AccountId) -> Result<(), CongressError> {
        if caller != self.engine {
            return Err(CongressError::NotEngine(caller));
        }
        Ok(())
    }

    // --- admission ---

    pub fn create_proposal(
        &mut self,
        proposer: AccountId,
        target: AccountId,
        detail: String,
        block: BlockNumber,
    ) -> Result<ProposalId, CongressError> {
        Ok(self
            .proposals
            .create_proposal(proposer, target, detail, block, &self.config)?)
    }

    pub fn vote_proposal(
        &mut self,
        voter: AccountId,
        id: ProposalId,
        approve: bool,
        block: BlockNumber,
    ) -> Result<Option<ProposalOutcome>, CongressError> {
        Ok(self.proposals.vote(
            voter,
            id,
            approve,
            block,
            self.coordinator.active_validators(),
        )?)
    }

    // --- staking ---

    /// Stake behind a validator. A revival from jail or full exit also
    /// wipes the validator's missed-block record.
    pub fn stake(
        &mut self,
        staker: AccountId,
        validator: AccountId,
        info: Option<StakeInfo>,
        amount: Balance,
    ) -> Result<StakeEvent, CongressError> {
        let event = self.staking.stake(
            staker,
            validator,
            info,
            amount,
            &self.config,
            &self.proposals,
            &mut self.ranking,
        )?;
        if event == StakeEvent::Restaked {
            self.punish.clear_record(&validator);
        }
        Ok(event)
    }

    pub fn unstake(
        &mut self,
        staker: AccountId,
        validator: AccountId,
        block: BlockNumber,
    ) -> Result<Balance, CongressError> {
        Ok(self.staking.unstake(
            staker,
            validator,
            block,
            &mut self.ranking,
            &mut self.proposals,
        )?)
    }

    /// Release an unlocked stake. Returns the amount the host must pay out.
    pub fn withdraw_staking(
        &mut self,
        staker: AccountId,
        validator: AccountId,
        block: BlockNumber,
    ) -> Result<Balance, CongressError> {
        Ok(self.staking.withdraw(staker, validator, block, &self.config)?)
    }

    pub fn edit_validator(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        fee_addr: AccountId,
        moniker: String,
    ) -> Result<(), CongressError> {
        Ok(self
            .staking
            .edit_validator(caller, validator, fee_addr, moniker, &self.config)?)
    }

    pub fn set_manager(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        manager: AccountId,
    ) -> Result<(), CongressError> {
        Ok(self.staking.set_manager(caller, validator, manager)?)
    }

    pub fn submit_percent(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        percent_bps: u32,
        block: BlockNumber,
    ) -> Result<(), CongressError> {
        Ok(self
            .staking
            .submit_percent(caller, validator, percent_bps, block)?)
    }

    pub fn confirm_percent(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        block: BlockNumber,
    ) -> Result<u32, CongressError> {
        Ok(self
            .staking
            .confirm_percent(caller, validator, block, &self.config)?)
    }

    // --- rewards ---

    pub fn distribute_block_reward(
        &mut self,
        caller: AccountId,
        amount: Balance,
    ) -> Result<RewardBreakdown, CongressError> {
        self.ensure_engine(caller)?;
        Ok(self.distributor.distribute_block_reward(
            amount,
            self.coordinator.active_validators(),
            self.coordinator.backup_validators(),
            &mut self.staking,
            &mut self.token,
            &self.config,
        )?)
    }

    pub fn withdraw_profit(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        block: BlockNumber,
    ) -> Result<WithdrawnProfit, CongressError> {
        Ok(self.distributor.withdraw_profit(
            caller,
            validator,
            block,
            &mut self.staking,
            &mut self.token,
            &self.config,
        )?)
    }

    // --- discipline ---

    pub fn punish(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        block: BlockNumber,
    ) -> Result<PunishOutcome, CongressError> {
        self.ensure_engine(caller)?;
        Ok(self.punish.punish(
            validator,
            block,
            self.coordinator.active_validators(),
            &mut self.staking,
            &mut self.ranking,
            &mut self.proposals,
            &self.config,
        )?)
    }

    // --- epochs ---

    /// Run the epoch transition on the last block of an epoch: decay
    /// missed-block counters of validators that sat the epoch out, then
    /// rotate the active and backup sets from the ranking.
    pub fn epoch_transition(
        &mut self,
        caller: AccountId,
        block: BlockNumber,
    ) -> Result<RotationDiff, CongressError> {
        self.ensure_engine(caller)?;
        if !self.schedule.is_epoch_end(block) {
            return Err(CongressError::Coordinator(
                CoordinatorError::NotEpochBoundary(block),
            ));
        }
        let epoch_start = self.schedule.epoch_start(self.schedule.epoch_of(block));
        self.punish.decay_counters(epoch_start, &self.config);
        Ok(self
            .coordinator
            .rotate(block, &self.ranking, &self.schedule, &self.config)?)
    }

    // --- queries ---

    pub fn config(&self) -> &CongressConfig {
        &self.config
    }

    pub fn admin(&self) -> AccountId {
        self.admin
    }

    pub fn engine(&self) -> AccountId {
        self.engine
    }

    pub fn active_validators(&self) -> &[AccountId] {
        self.coordinator.active_validators()
    }

    pub fn backup_validators(&self) -> &[AccountId] {
        self.coordinator.backup_validators()
    }

    pub fn validator(&self, id: &AccountId) -> Option<&ValidatorRecord> {
        self.staking.validator(id)
    }

    pub fn has_standing(&self, id: &AccountId) -> bool {
        self.proposals.has_standing(id)
    }

    pub fn missed_count(&self, id: &AccountId) -> u64 {
        self.punish.missed_count(id)
    }

    pub fn token(&self) -> &RewardToken {
        &self.token
    }

    pub fn ranking(&self) -> &RankedRegistry {
        &self.ranking
    }
}

/// Unified error surface of the facade
#[derive(Debug, thiserror::Error)]
pub enum CongressError {
    #[error("Caller {0} is not the admin")]
    NotAdmin(AccountId),

    #[error("Caller {0} is not the consensus engine")]
    NotEngine(AccountId),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Proposal(#[from] ProposalError),

    #[error(transparent)]
    Staking(#[from] StakingError),

    #[error(transparent)]
    Reward(#[from] RewardError),

    #[error(transparent)]
    Punish(#[from] PunishError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}
