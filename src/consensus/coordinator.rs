// Coordinator - Epoch rotation of the active and backup validator sets
// Principle: the chain never rotates into an empty producer set

use crate::config::CongressConfig;
use crate::consensus::epoch::EpochSchedule;
use crate::consensus::ranking::{RankedRegistry, ValidatorClass};
use crate::types::{AccountId, BlockNumber, EpochNumber};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Membership change produced by one rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationDiff {
    pub epoch: EpochNumber,

    /// Accounts entering the active set this epoch
    pub incoming: Vec<AccountId>,

    /// Accounts leaving the active set this epoch
    pub outgoing: Vec<AccountId>,
}

impl RotationDiff {
    pub fn is_unchanged(&self) -> bool {
        self.incoming.is_empty() && self.outgoing.is_empty()
    }
}

/// Holds the current active (block-producing) and backup sets and rotates
/// them from the ranking at epoch boundaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorSetCoordinator {
    active: Vec<AccountId>,
    backup: Vec<AccountId>,
    current_epoch: EpochNumber,
}

impl ValidatorSetCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the genesis active set directly, before any ranking exists.
    pub(crate) fn init_genesis(&mut self, genesis: &[AccountId]) {
        self.active = genesis.to_vec();
    }

    pub fn active_validators(&self) -> &[AccountId] {
        &self.active
    }

    pub fn backup_validators(&self) -> &[AccountId] {
        &self.backup
    }

    pub fn is_active(&self, id: &AccountId) -> bool {
        self.active.contains(id)
    }

    pub fn current_epoch(&self) -> EpochNumber {
        self.current_epoch
    }

    /// Rotate both sets from the ranking. Only valid on the last block of
    /// an epoch.
    ///
    /// An empty candidate ranking keeps the previous active set in place so
    /// block production continues.
    pub fn rotate(
        &mut self,
        block: BlockNumber,
        ranking: &RankedRegistry,
        schedule: &EpochSchedule,
        config: &CongressConfig,
    ) -> Result<RotationDiff, CoordinatorError> {
        if !schedule.is_epoch_end(block) {
            return Err(CoordinatorError::NotEpochBoundary(block));
        }
        // Rotation on the last block of epoch e installs the set for e + 1
        let epoch = schedule.epoch_of(block) + 1;

        let next_active = ranking.top_n(ValidatorClass::Primary, config.max_active);
        let next_backup = ranking.top_n(ValidatorClass::Backup, config.max_backup);

        if next_active.is_empty() {
            self.current_epoch = epoch;
            self.backup = next_backup;
            info!(epoch, "no ranked candidates, active set retained");
            return Ok(RotationDiff {
                epoch,
                incoming: Vec::new(),
                outgoing: Vec::new(),
            });
        }

        let incoming: Vec<AccountId> = next_active
            .iter()
            .filter(|id| !self.active.contains(id))
            .copied()
            .collect();
        let outgoing: Vec<AccountId> = self
            .active
            .iter()
            .filter(|id| !next_active.contains(id))
            .copied()
            .collect();

        self.active = next_active;
        self.backup = next_backup;
        self.current_epoch = epoch;

        info!(
            epoch,
            active = self.active.len(),
            backup = self.backup.len(),
            joined = incoming.len(),
            left = outgoing.len(),
            "validator set rotated"
        );
        Ok(RotationDiff {
            epoch,
            incoming,
            outgoing,
        })
    }
}

/// Coordination errors
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Block {0} is not the last block of an epoch")]
    NotEpochBoundary(BlockNumber),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(n: u8) -> AccountId {
        AccountId::from_bytes([n; 32])
    }

    fn ranked(entries: &[(u8, u128, ValidatorClass)]) -> RankedRegistry {
        let mut ranking = RankedRegistry::new();
        for (n, weight, class) in entries {
            ranking.insert(acct(*n), *weight, *class).unwrap();
        }
        ranking
    }

    #[test]
    fn test_rotation_picks_top_by_class() {
        let mut config = CongressConfig::default();
        config.max_active = 2;
        config.max_backup = 1;
        let schedule = EpochSchedule::new(200);
        let ranking = ranked(&[
            (1, 50, ValidatorClass::Primary),
            (2, 80, ValidatorClass::Primary),
            (3, 30, ValidatorClass::Primary),
            (4, 90, ValidatorClass::Backup),
            (5, 10, ValidatorClass::Backup),
        ]);

        let mut coordinator = ValidatorSetCoordinator::new();
        let diff = coordinator.rotate(199, &ranking, &schedule, &config).unwrap();

        assert_eq!(coordinator.active_validators(), &[acct(2), acct(1)]);
        assert_eq!(coordinator.backup_validators(), &[acct(4)]);
        assert_eq!(coordinator.current_epoch(), 1);
        assert_eq!(diff.incoming, vec![acct(2), acct(1)]);
        assert!(diff.outgoing.is_empty());
    }

    #[test]
    fn test_rotation_diff_tracks_membership_change() {
        let mut config = CongressConfig::default();
        config.max_active = 2;
        let schedule = EpochSchedule::new(200);

        let mut coordinator = ValidatorSetCoordinator::new();
        let ranking = ranked(&[
            (1, 50, ValidatorClass::Primary),
            (2, 80, ValidatorClass::Primary),
        ]);
        coordinator.rotate(199, &ranking, &schedule, &config).unwrap();

        // acct(3) overtakes acct(1)
        let ranking = ranked(&[
            (1, 50, ValidatorClass::Primary),
            (2, 80, ValidatorClass::Primary),
            (3, 60, ValidatorClass::Primary),
        ]);
        let diff = coordinator.rotate(399, &ranking, &schedule, &config).unwrap();
        assert_eq!(diff.incoming, vec![acct(3)]);
        assert_eq!(diff.outgoing, vec![acct(1)]);
        assert_eq!(coordinator.active_validators(), &[acct(2), acct(3)]);
    }

    #[test]
    fn test_rotation_rejected_off_boundary() {
        let config = CongressConfig::default();
        let schedule = EpochSchedule::new(200);
        let ranking = RankedRegistry::new();

        let mut coordinator = ValidatorSetCoordinator::new();
        assert!(matches!(
            coordinator.rotate(150, &ranking, &schedule, &config),
            Err(CoordinatorError::NotEpochBoundary(150))
        ));
    }

    #[test]
    fn test_empty_ranking_retains_active_set() {
        let mut config = CongressConfig::default();
        config.max_active = 2;
        let schedule = EpochSchedule::new(200);

        let mut coordinator = ValidatorSetCoordinator::new();
        coordinator.init_genesis(&[acct(1), acct(2)]);

        let diff = coordinator
            .rotate(199, &RankedRegistry::new(), &schedule, &config)
            .unwrap();
        assert!(diff.is_unchanged());
        assert_eq!(coordinator.active_validators(), &[acct(1), acct(2)]);
    }

    #[test]
    fn test_unchanged_rotation_has_empty_diff() {
        let mut config = CongressConfig::default();
        config.max_active = 2;
        let schedule = EpochSchedule::new(200);
        let ranking = ranked(&[
            (1, 50, ValidatorClass::Primary),
            (2, 80, ValidatorClass::Primary),
        ]);

        let mut coordinator = ValidatorSetCoordinator::new();
        coordinator.rotate(199, &ranking, &schedule, &config).unwrap();
        let diff = coordinator.rotate(399, &ranking, &schedule, &config).unwrap();
        assert!(diff.is_unchanged());
    }
}
