//! Plain in-memory implementations of the ledger and combat contracts.

use std::collections::{BTreeMap, BTreeSet};

use crate::entity::{EntityId, PlayerSlot};
use crate::services::{CombatAuthority, ResourceLedger};

/// Credits per player.
#[derive(Debug, Clone, Default)]
pub struct Treasury {
    balances: BTreeMap<PlayerSlot, f64>,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts every listed player with the same balance.
    pub fn with_starting_credits(players: &[PlayerSlot], credits: f64) -> Self {
        Self {
            balances: players.iter().map(|p| (*p, credits)).collect(),
        }
    }
}

impl ResourceLedger for Treasury {
    fn balance(&self, owner: PlayerSlot) -> f64 {
        self.balances.get(&owner).copied().unwrap_or(0.0)
    }

    fn spend(&mut self, owner: PlayerSlot, amount: f64) -> bool {
        let balance = self.balances.entry(owner).or_insert(0.0);
        if amount < 0.0 || *balance < amount {
            return false;
        }
        *balance -= amount;
        true
    }

    fn credit(&mut self, owner: PlayerSlot, amount: f64) {
        *self.balances.entry(owner).or_insert(0.0) += amount.max(0.0);
    }
}

/// Set of units currently tagged for attack-move.
#[derive(Debug, Clone, Default)]
pub struct AttackMoveTags {
    tagged: BTreeSet<EntityId>,
}

impl AttackMoveTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tagged(&self, id: EntityId) -> bool {
        self.tagged.contains(&id)
    }

    pub fn tagged(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.tagged.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.tagged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tagged.is_empty()
    }
}

impl CombatAuthority for AttackMoveTags {
    fn tag_for_attack_move(&mut self, ids: &[EntityId]) {
        self.tagged.extend(ids.iter().copied());
    }

    fn clear_attack_move(&mut self, ids: &[EntityId]) {
        for id in ids {
            self.tagged.remove(id);
        }
    }
}
