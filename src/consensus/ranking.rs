// RankedRegistry - Weight-descending ordered registry of eligible candidates
// Principle: arena-backed links, no raw pointers, no dangling references

use crate::types::{AccountId, Balance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Class tag deciding which set a candidate competes for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorClass {
    /// Competes for the active (block-producing) set
    Primary,
    /// Competes for the backup (reserve) set
    Backup,
}

/// One linked node of the ranking. Links are account ids resolved through the
/// arena map, so removal can never leave a dangling reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RankedNode {
    prev: Option<AccountId>,
    next: Option<AccountId>,
    weight: Balance,
    class: ValidatorClass,
}

/// Doubly linked registry kept sorted non-increasing by weight.
///
/// `improve_ranking` / `lower_ranking` move a node past strictly lesser or
/// strictly greater neighbors only, so equal-weight candidates keep their
/// prior relative order (stable ranking). Cost is proportional to positions
/// moved, not to registry length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankedRegistry {
    nodes: BTreeMap<AccountId, RankedNode>,
    head: Option<AccountId>,
    tail: Option<AccountId>,
}

impl RankedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn weight_of(&self, id: &AccountId) -> Option<Balance> {
        self.nodes.get(id).map(|n| n.weight)
    }

    /// Append at the tail, then rank upward to the correct position.
    pub fn insert(
        &mut self,
        id: AccountId,
        weight: Balance,
        class: ValidatorClass,
    ) -> Result<(), RankingError> {
        if self.nodes.contains_key(&id) {
            return Err(RankingError::AlreadyRanked(id));
        }

        let node = RankedNode {
            prev: self.tail,
            next: None,
            weight,
            class,
        };

        match self.tail {
            Some(old_tail) => {
                self.link_next(old_tail, Some(id));
            }
            None => {
                self.head = Some(id);
            }
        }
        self.tail = Some(id);
        self.nodes.insert(id, node);

        self.improve_ranking(&id)?;
        Ok(())
    }

    /// Unlink in O(1), relinking the neighbors.
    pub fn remove(&mut self, id: &AccountId) -> Result<(), RankingError> {
        let node = self
            .nodes
            .remove(id)
            .ok_or(RankingError::NotRanked(*id))?;

        match node.prev {
            Some(prev) => self.link_next(prev, node.next),
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.link_prev(next, node.prev),
            None => self.tail = node.prev,
        }
        Ok(())
    }

    /// Record a new weight and move the node to its correct position.
    pub fn set_weight(&mut self, id: &AccountId, weight: Balance) -> Result<(), RankingError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(RankingError::NotRanked(*id))?;
        let old = node.weight;
        node.weight = weight;

        if weight > old {
            self.improve_ranking(id)
        } else if weight < old {
            self.lower_ranking(id)
        } else {
            Ok(())
        }
    }

    /// Walk backward, swapping with each predecessor of strictly lesser
    /// weight. Terminates at the head or at the first predecessor with
    /// weight >= ours.
    pub fn improve_ranking(&mut self, id: &AccountId) -> Result<(), RankingError> {
        if !self.nodes.contains_key(id) {
            return Err(RankingError::NotRanked(*id));
        }

        loop {
            let weight = self.nodes[id].weight;
            let prev = match self.nodes[id].prev {
                Some(p) => p,
                None => break,
            };
            if self.nodes[&prev].weight >= weight {
                break;
            }
            self.swap_with_prev(*id, prev);
        }
        Ok(())
    }

    /// Mirror walk forward past strictly greater successors.
    pub fn lower_ranking(&mut self, id: &AccountId) -> Result<(), RankingError> {
        if !self.nodes.contains_key(id) {
            return Err(RankingError::NotRanked(*id));
        }

        loop {
            let weight = self.nodes[id].weight;
            let next = match self.nodes[id].next {
                Some(n) => n,
                None => break,
            };
            if self.nodes[&next].weight <= weight {
                break;
            }
            self.swap_with_prev(next, *id);
        }
        Ok(())
    }

    /// Up to `n` candidates of `class` in ranked order, scanning from the head.
    pub fn top_n(&self, class: ValidatorClass, n: usize) -> Vec<AccountId> {
        let mut result = Vec::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            if result.len() == n {
                break;
            }
            let node = &self.nodes[&id];
            if node.class == class {
                result.push(id);
            }
            cursor = node.next;
        }
        result
    }

    /// All ranked ids from head to tail
    pub fn iter_ranked(&self) -> Vec<AccountId> {
        let mut result = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            result.push(id);
            cursor = self.nodes[&id].next;
        }
        result
    }

    /// Structural invariant: non-increasing adjacent weights, link symmetry,
    /// head/tail consistency, every node reachable exactly once.
    pub fn check_invariants(&self) -> Result<(), RankingError> {
        let ranked = self.iter_ranked();
        if ranked.len() != self.nodes.len() {
            return Err(RankingError::Corrupt("unreachable nodes"));
        }
        if self.head != ranked.first().copied() || self.tail != ranked.last().copied() {
            return Err(RankingError::Corrupt("head/tail mismatch"));
        }
        for pair in ranked.windows(2) {
            let a = &self.nodes[&pair[0]];
            let b = &self.nodes[&pair[1]];
            if a.weight < b.weight {
                return Err(RankingError::Corrupt("order violated"));
            }
            if a.next != Some(pair[1]) || b.prev != Some(pair[0]) {
                return Err(RankingError::Corrupt("link asymmetry"));
            }
        }
        Ok(())
    }

    /// Move `b` directly before its predecessor `a` (adjacent swap).
    fn swap_with_prev(&mut self, b: AccountId, a: AccountId) {
        let before = self.nodes[&a].prev;
        let after = self.nodes[&b].next;

        match before {
            Some(p) => self.link_next(p, Some(b)),
            None => self.head = Some(b),
        }
        if let Some(nb) = self.nodes.get_mut(&b) {
            nb.prev = before;
            nb.next = Some(a);
        }
        if let Some(na) = self.nodes.get_mut(&a) {
            na.prev = Some(b);
            na.next = after;
        }
        match after {
            Some(n) => self.link_prev(n, Some(a)),
            None => self.tail = Some(a),
        }
    }

    fn link_next(&mut self, id: AccountId, next: Option<AccountId>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.next = next;
        }
    }

    fn link_prev(&mut self, id: AccountId, prev: Option<AccountId>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.prev = prev;
        }
    }
}

/// Ranking errors
#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error("Candidate {0} already ranked")]
    AlreadyRanked(AccountId),

    #[error("Candidate {0} not ranked")]
    NotRanked(AccountId),

    #[error("Ranking corrupt: {0}")]
    Corrupt(&'static str),
}
