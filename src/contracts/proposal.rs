// Proposal - Majority-vote admission of validator candidates
// Principle: membership is granted by the current validators, never self-claimed

use crate::config::CongressConfig;
use crate::types::{AccountId, BlockNumber};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Unique identifier for an admission proposal
pub type ProposalId = u64;

/// Final outcome of a resolved proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalOutcome {
    Passed,
    Rejected,
}

/// One admission proposal for a candidate account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,

    /// Who opened the proposal (any account may)
    pub proposer: AccountId,

    /// Candidate the proposal admits
    pub target: AccountId,

    /// Free-form candidate description, length-capped
    pub detail: String,

    pub created_at: BlockNumber,

    /// First block at which voting is no longer accepted
    pub expires_at: BlockNumber,

    pub agree: u64,
    pub reject: u64,

    /// Voters that already cast a vote, one vote each
    voted: BTreeSet<AccountId>,

    pub outcome: Option<ProposalOutcome>,
}

impl Proposal {
    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn has_voted(&self, voter: &AccountId) -> bool {
        self.voted.contains(voter)
    }
}

/// Registry of admission proposals and the standing they grant.
///
/// Standing ("pass") is what entitles an account to create a validator record
/// in the staking ledger. It persists until explicitly revoked, which happens
/// when the validator leaves for cause (full unstake or jailing).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalRegistry {
    proposals: BTreeMap<ProposalId, Proposal>,
    next_id: ProposalId,
    standing: BTreeSet<AccountId>,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a proposal for `target`. Anyone may propose; a candidate that
    /// already holds standing cannot be proposed again.
    pub fn create_proposal(
        &mut self,
        proposer: AccountId,
        target: AccountId,
        detail: String,
        block: BlockNumber,
        config: &CongressConfig,
    ) -> Result<ProposalId, ProposalError> {
        if detail.len() > config.max_proposal_detail {
            return Err(ProposalError::DetailTooLong);
        }
        if self.standing.contains(&target) {
            return Err(ProposalError::AlreadyPassed(target));
        }

        let id = self.next_id;
        self.next_id += 1;

        let proposal = Proposal {
            id,
            proposer,
            target,
            detail,
            created_at: block,
            expires_at: block + config.proposal_lasting_period,
            agree: 0,
            reject: 0,
            voted: BTreeSet::new(),
            outcome: None,
        };
        self.proposals.insert(id, proposal);

        info!(%proposer, %target, id, "admission proposal created");
        Ok(id)
    }

    /// Cast one vote. `validators` is the current active set; only its
    /// members vote and the majority threshold derives from its size.
    /// Resolves the proposal the moment either side reaches
    /// floor(len/2) + 1 and returns the outcome if this vote decided it.
    pub fn vote(
        &mut self,
        voter: AccountId,
        id: ProposalId,
        approve: bool,
        block: BlockNumber,
        validators: &[AccountId],
    ) -> Result<Option<ProposalOutcome>, ProposalError> {
        if !validators.contains(&voter) {
            return Err(ProposalError::ValidatorOnly(voter));
        }

        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(ProposalError::NotFound(id))?;

        if proposal.is_resolved() {
            return Err(ProposalError::AlreadyResolved(id));
        }
        if block >= proposal.expires_at {
            return Err(ProposalError::Expired(id));
        }
        if proposal.has_voted(&voter) {
            return Err(ProposalError::AlreadyVoted(voter));
        }

        proposal.voted.insert(voter);
        if approve {
            proposal.agree += 1;
        } else {
            proposal.reject += 1;
        }
        info!(%voter, id, approve, "admission vote recorded");

        let threshold = (validators.len() as u64) / 2 + 1;
        if proposal.agree >= threshold {
            proposal.outcome = Some(ProposalOutcome::Passed);
            let target = proposal.target;
            self.standing.insert(target);
            info!(id, %target, "admission proposal passed");
            return Ok(Some(ProposalOutcome::Passed));
        }
        if proposal.reject >= threshold {
            proposal.outcome = Some(ProposalOutcome::Rejected);
            info!(id, target = %proposal.target, "admission proposal rejected");
            return Ok(Some(ProposalOutcome::Rejected));
        }
        Ok(None)
    }

    /// Does `target` currently hold admission standing?
    pub fn has_standing(&self, target: &AccountId) -> bool {
        self.standing.contains(target)
    }

    /// Clear standing after a removal for cause; the target must re-pass
    /// a proposal before staking again. Invoked only by the staking and
    /// punishment paths, never by external callers.
    pub(crate) fn revoke(&mut self, target: &AccountId) {
        if self.standing.remove(target) {
            info!(%target, "admission standing revoked");
        }
    }

    /// Grant standing directly; used only for genesis validators.
    pub(crate) fn grant(&mut self, target: AccountId) {
        self.standing.insert(target);
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }
}

/// Admission errors
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("Detail too long")]
    DetailTooLong,

    #[error("Target {0} already passed, staking is open")]
    AlreadyPassed(AccountId),

    #[error("Proposal {0} not found")]
    NotFound(ProposalId),

    #[error("Proposal {0} already resolved")]
    AlreadyResolved(ProposalId),

    #[error("Proposal {0} expired")]
    Expired(ProposalId),

    #[error("Account {0} is not a validator")]
    ValidatorOnly(AccountId),

    #[error("Account {0} already voted on this proposal")]
    AlreadyVoted(AccountId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(n: u8) -> AccountId {
        AccountId::from_bytes([n; 32])
    }

    fn vals(n: u8) -> Vec<AccountId> {
        (0..n).map(acct).collect()
    }

    #[test]
    fn test_anyone_can_propose() {
        let config = CongressConfig::default();
        let mut reg = ProposalRegistry::new();

        let id0 = reg
            .create_proposal(acct(9), acct(10), String::new(), 0, &config)
            .unwrap();
        let id1 = reg
            .create_proposal(acct(8), acct(10), String::new(), 0, &config)
            .unwrap();
        assert_eq!(id0, 0);
        assert_eq!(id1, 1);
    }

    #[test]
    fn test_detail_length_capped() {
        let config = CongressConfig::default();
        let mut reg = ProposalRegistry::new();

        let detail = "x".repeat(config.max_proposal_detail + 1);
        assert!(matches!(
            reg.create_proposal(acct(1), acct(2), detail, 0, &config),
            Err(ProposalError::DetailTooLong)
        ));
    }

    #[test]
    fn test_majority_pass_with_five_validators() {
        let config = CongressConfig::default();
        let mut reg = ProposalRegistry::new();
        let validators = vals(5);

        let id = reg
            .create_proposal(acct(9), acct(10), "test".into(), 0, &config)
            .unwrap();

        // threshold = 5/2 + 1 = 3
        assert_eq!(reg.vote(acct(0), id, true, 1, &validators).unwrap(), None);
        assert_eq!(reg.vote(acct(1), id, true, 1, &validators).unwrap(), None);
        assert_eq!(
            reg.vote(acct(2), id, true, 1, &validators).unwrap(),
            Some(ProposalOutcome::Passed)
        );
        assert!(reg.has_standing(&acct(10)));

        // Resolved: no further votes accepted
        assert!(matches!(
            reg.vote(acct(3), id, false, 1, &validators),
            Err(ProposalError::AlreadyResolved(_))
        ));
    }

    #[test]
    fn test_majority_reject() {
        let config = CongressConfig::default();
        let mut reg = ProposalRegistry::new();
        let validators = vals(5);

        let id = reg
            .create_proposal(acct(9), acct(10), "test".into(), 0, &config)
            .unwrap();

        reg.vote(acct(0), id, true, 1, &validators).unwrap();
        reg.vote(acct(1), id, true, 1, &validators).unwrap();
        reg.vote(acct(2), id, false, 1, &validators).unwrap();
        reg.vote(acct(3), id, false, 1, &validators).unwrap();
        assert_eq!(
            reg.vote(acct(4), id, false, 1, &validators).unwrap(),
            Some(ProposalOutcome::Rejected)
        );
        assert!(!reg.has_standing(&acct(10)));
    }

    #[test]
    fn test_only_validators_vote() {
        let config = CongressConfig::default();
        let mut reg = ProposalRegistry::new();
        let validators = vals(3);

        let id = reg
            .create_proposal(acct(9), acct(10), String::new(), 0, &config)
            .unwrap();
        assert!(matches!(
            reg.vote(acct(7), id, true, 1, &validators),
            Err(ProposalError::ValidatorOnly(_))
        ));
    }

    #[test]
    fn test_one_vote_per_voter() {
        let config = CongressConfig::default();
        let mut reg = ProposalRegistry::new();
        let validators = vals(5);

        let id = reg
            .create_proposal(acct(9), acct(10), String::new(), 0, &config)
            .unwrap();
        reg.vote(acct(0), id, true, 1, &validators).unwrap();
        assert!(matches!(
            reg.vote(acct(0), id, false, 1, &validators),
            Err(ProposalError::AlreadyVoted(_))
        ));
    }

    #[test]
    fn test_expired_proposal_rejects_votes() {
        let config = CongressConfig::default();
        let mut reg = ProposalRegistry::new();
        let validators = vals(5);

        let id = reg
            .create_proposal(acct(9), acct(10), String::new(), 0, &config)
            .unwrap();
        let at_expiry = config.proposal_lasting_period;
        assert!(matches!(
            reg.vote(acct(0), id, true, at_expiry, &validators),
            Err(ProposalError::Expired(_))
        ));
    }

    #[test]
    fn test_cannot_propose_passed_target() {
        let config = CongressConfig::default();
        let mut reg = ProposalRegistry::new();
        let validators = vals(3);

        let id = reg
            .create_proposal(acct(9), acct(10), String::new(), 0, &config)
            .unwrap();
        reg.vote(acct(0), id, true, 1, &validators).unwrap();
        reg.vote(acct(1), id, true, 1, &validators).unwrap();
        assert!(reg.has_standing(&acct(10)));

        assert!(matches!(
            reg.create_proposal(acct(9), acct(10), String::new(), 2, &config),
            Err(ProposalError::AlreadyPassed(_))
        ));
    }

    #[test]
    fn test_revoke_requires_repass() {
        let config = CongressConfig::default();
        let mut reg = ProposalRegistry::new();
        let validators = vals(3);

        let id = reg
            .create_proposal(acct(9), acct(10), String::new(), 0, &config)
            .unwrap();
        reg.vote(acct(0), id, true, 1, &validators).unwrap();
        reg.vote(acct(1), id, true, 1, &validators).unwrap();

        reg.revoke(&acct(10));
        assert!(!reg.has_standing(&acct(10)));

        // A fresh proposal can now be created and passed again
        let id = reg
            .create_proposal(acct(9), acct(10), String::new(), 10, &config)
            .unwrap();
        reg.vote(acct(0), id, true, 11, &validators).unwrap();
        reg.vote(acct(1), id, true, 11, &validators).unwrap();
        assert!(reg.has_standing(&acct(10)));
    }
}
