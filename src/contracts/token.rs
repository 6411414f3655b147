// Token - Hard-capped reward token mirroring native profit
// Principle: supply never exceeds the cap, reserved or released

use crate::types::{AccountId, Balance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Hard-capped reward token.
///
/// Profit accrual mints into an internal reserve; withdrawal releases from
/// the reserve to the recipient. `total_supply == reserved + sum(balances)`
/// holds at all times and never exceeds the cap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardToken {
    cap: Balance,
    total_supply: Balance,
    reserved: Balance,
    balances: BTreeMap<AccountId, Balance>,
}

impl RewardToken {
    pub fn new(cap: Balance) -> Self {
        Self {
            cap,
            ..Default::default()
        }
    }

    pub fn cap(&self) -> Balance {
        self.cap
    }

    pub fn total_supply(&self) -> Balance {
        self.total_supply
    }

    pub fn reserved(&self) -> Balance {
        self.reserved
    }

    pub fn balance_of(&self, who: &AccountId) -> Balance {
        self.balances.get(who).copied().unwrap_or(0)
    }

    /// Supply still mintable before hitting the cap
    pub fn remaining_mintable(&self) -> Balance {
        self.cap.saturating_sub(self.total_supply)
    }

    /// Mint `amount` into the reserve. All-or-nothing against the cap.
    pub fn mint_reserved(&mut self, amount: Balance) -> Result<(), TokenError> {
        if amount > self.remaining_mintable() {
            return Err(TokenError::CapExceeded {
                requested: amount,
                remaining: self.remaining_mintable(),
            });
        }
        self.total_supply += amount;
        self.reserved += amount;
        Ok(())
    }

    /// Move `amount` from the reserve to `to`'s balance.
    pub fn release(&mut self, to: AccountId, amount: Balance) -> Result<(), TokenError> {
        if amount > self.reserved {
            return Err(TokenError::InsufficientReserve {
                requested: amount,
                reserved: self.reserved,
            });
        }
        self.reserved -= amount;
        *self.balances.entry(to).or_insert(0) += amount;
        info!(%to, amount, "reward token released");
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Balance,
    ) -> Result<(), TokenError> {
        let from_balance = self.balance_of(&from);
        if amount > from_balance {
            return Err(TokenError::InsufficientBalance {
                requested: amount,
                balance: from_balance,
            });
        }
        if let Some(balance) = self.balances.get_mut(&from) {
            *balance -= amount;
        }
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

/// Token errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Mint of {requested} exceeds cap, {remaining} remaining")]
    CapExceeded {
        requested: Balance,
        remaining: Balance,
    },

    #[error("Release of {requested} exceeds reserve of {reserved}")]
    InsufficientReserve {
        requested: Balance,
        reserved: Balance,
    },

    #[error("Transfer of {requested} exceeds balance of {balance}")]
    InsufficientBalance {
        requested: Balance,
        balance: Balance,
    },
}
