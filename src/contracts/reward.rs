// Reward - Stake-proportional distribution of block rewards
// Principle: every unit of every reward is accounted for, none minted or lost

use crate::config::CongressConfig;
use crate::contracts::staking::StakingLedger;
use crate::contracts::token::RewardToken;
use crate::types::{AccountId, Balance, BlockNumber, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Where one block reward went, exactly.
///
/// `burned + foundation + active_total + backup_total` always equals the
/// distributed amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardBreakdown {
    pub burned: Balance,
    pub foundation: Balance,
    pub active_total: Balance,
    pub backup_total: Balance,
}

/// Result of a profit withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawnProfit {
    /// Recipient the host pays out to
    pub fee_addr: AccountId,
    pub native: Balance,
    pub token: Balance,
}

/// Splits block rewards across the active and backup sets and accrues the
/// shares as pending profit on each validator record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardDistributor {
    pub total_distributed: Balance,
    pub total_burned: Balance,
    pub foundation_accrued: Balance,
}

impl RewardDistributor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distribute one block reward.
    ///
    /// Burn and foundation cuts come off the top; the backup set takes its
    /// configured share of the rest, the active set the remainder. Jailed
    /// members earn nothing. If a set has no eligible member its share folds
    /// into the active set, and if neither set has one the whole distributable
    /// amount accrues to the foundation.
    pub fn distribute_block_reward(
        &mut self,
        amount: Balance,
        active: &[AccountId],
        backup: &[AccountId],
        staking: &mut StakingLedger,
        token: &mut RewardToken,
        config: &CongressConfig,
    ) -> Result<RewardBreakdown, RewardError> {
        if amount == 0 {
            return Ok(RewardBreakdown::default());
        }

        let burned = mul_bps(amount, config.burn_rate_bps)?;
        let foundation_cut = mul_bps(amount, config.foundation_rate_bps)?;
        let distributable = amount - burned - foundation_cut;

        let active_members = eligible_members(active, staking);
        let backup_members = eligible_members(backup, staking);

        let mut foundation = foundation_cut;
        let (active_total, backup_total) = if active_members.is_empty()
            && backup_members.is_empty()
        {
            foundation += distributable;
            (0, 0)
        } else if backup_members.is_empty() {
            (distributable, 0)
        } else if active_members.is_empty() {
            (0, distributable)
        } else {
            let backup_total = mul_bps(distributable, config.backup_share_bps)?;
            (distributable - backup_total, backup_total)
        };

        let active_shares = split_proportional(active_total, &active_members)?;
        let backup_shares = split_proportional(backup_total, &backup_members)?;

        // Token mirror is all-or-nothing: once the cap cannot cover a full
        // block, the mirror stops and native accrual continues alone.
        let mirror_total = active_total + backup_total;
        let mirror = match token.mint_reserved(mirror_total) {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    needed = mirror_total,
                    remaining = token.remaining_mintable(),
                    "reward token cap reached, mirror skipped"
                );
                false
            }
        };

        for (member, share) in active_shares.iter().chain(backup_shares.iter()) {
            if let Some(record) = staking.validator_mut(member) {
                record.pending_profit += share;
                if mirror {
                    record.pending_token_profit += share;
                }
            }
        }

        self.total_distributed += amount;
        self.total_burned += burned;
        self.foundation_accrued += foundation;

        info!(
            amount,
            burned, foundation, active_total, backup_total, "block reward distributed"
        );
        Ok(RewardBreakdown {
            burned,
            foundation,
            active_total,
            backup_total,
        })
    }

    /// Withdraw a validator's accrued profit to its fee address.
    /// Rate-limited per validator; only the current fee address may call.
    pub fn withdraw_profit(
        &mut self,
        caller: AccountId,
        validator: AccountId,
        block: BlockNumber,
        staking: &mut StakingLedger,
        token: &mut RewardToken,
        config: &CongressConfig,
    ) -> Result<WithdrawnProfit, RewardError> {
        let record = staking
            .validator_mut(&validator)
            .ok_or(RewardError::ValidatorNotFound(validator))?;
        if caller != record.fee_addr {
            return Err(RewardError::NotAuthorized(caller));
        }
        if block < record.last_withdraw_profit_block + config.withdraw_profit_period {
            return Err(RewardError::WithdrawLocked);
        }
        if record.pending_profit == 0 && record.pending_token_profit == 0 {
            return Err(RewardError::EmptyProfit);
        }

        let native = record.pending_profit;
        let token_amount = record.pending_token_profit;
        let fee_addr = record.fee_addr;
        record.pending_profit = 0;
        record.pending_token_profit = 0;
        record.last_withdraw_profit_block = block;

        if token_amount > 0 {
            token
                .release(fee_addr, token_amount)
                .map_err(|_| RewardError::TokenReserve)?;
        }

        info!(val = %validator, %fee_addr, native, token = token_amount, "profit withdrawn");
        Ok(WithdrawnProfit {
            fee_addr,
            native,
            token: token_amount,
        })
    }
}

/// Members of `set` that exist and are not jailed, paired with their stake
fn eligible_members(set: &[AccountId], staking: &StakingLedger) -> Vec<(AccountId, Balance)> {
    set.iter()
        .filter_map(|id| {
            let record = staking.validator(id)?;
            if record.status == crate::contracts::staking::ValidatorStatus::Jailed {
                return None;
            }
            Some((*id, record.total_stake))
        })
        .collect()
}

/// Split `amount` across `members` proportionally to their weights, integer
/// division truncating each share and the last member absorbing the residual.
/// A zero aggregate weight degrades to an equal split. The returned shares
/// sum to `amount` exactly.
pub(crate) fn split_proportional(
    amount: Balance,
    members: &[(AccountId, Balance)],
) -> Result<Vec<(AccountId, Balance)>, RewardError> {
    if members.is_empty() || amount == 0 {
        return Ok(members.iter().map(|(id, _)| (*id, 0)).collect());
    }

    let total: Balance = members
        .iter()
        .try_fold(0 as Balance, |acc, (_, w)| acc.checked_add(*w))
        .ok_or(RewardError::Overflow)?;

    let mut shares = Vec::with_capacity(members.len());
    let mut paid: Balance = 0;
    for (id, weight) in &members[..members.len() - 1] {
        let share = if total == 0 {
            amount / members.len() as Balance
        } else {
            amount
                .checked_mul(*weight)
                .ok_or(RewardError::Overflow)?
                / total
        };
        paid += share;
        shares.push((*id, share));
    }
    let (last, _) = members[members.len() - 1];
    shares.push((last, amount - paid));
    Ok(shares)
}

/// `amount * bps / 10_000` with overflow checked
fn mul_bps(amount: Balance, bps: u32) -> Result<Balance, RewardError> {
    amount
        .checked_mul(bps as Balance)
        .map(|v| v / BPS_DENOMINATOR as Balance)
        .ok_or(RewardError::Overflow)
}

/// Reward errors
#[derive(Debug, thiserror::Error)]
pub enum RewardError {
    #[error("Arithmetic overflow in reward computation")]
    Overflow,

    #[error("Validator {0} not found")]
    ValidatorNotFound(AccountId),

    #[error("Caller {0} is not the reward recipient")]
    NotAuthorized(AccountId),

    #[error("Profit withdrawal interval not elapsed")]
    WithdrawLocked,

    #[error("You don't have any profit")]
    EmptyProfit,

    #[error("Reward token reserve out of sync")]
    TokenReserve,
}
