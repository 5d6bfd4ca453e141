//! Standing duties for owned units.
//!
//! A unit is at most one of defender, scout or special. Storing the duty in a
//! single map keyed by entity makes that exclusivity structural.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use rts_world::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Duty {
    /// Stays home and answers base alarms.
    Defender,
    /// Explores the map.
    Scout,
    /// Non-combat or special-category unit kept out of the army.
    Special,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DutyMap {
    duties: BTreeMap<EntityId, Duty>,
}

impl DutyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives `id` a duty if it has none. Returns false when it already holds
    /// a different one.
    pub fn assign(&mut self, id: EntityId, duty: Duty) -> bool {
        match self.duties.get(&id) {
            Some(current) => *current == duty,
            None => {
                self.duties.insert(id, duty);
                true
            }
        }
    }

    pub fn release(&mut self, id: EntityId) -> Option<Duty> {
        self.duties.remove(&id)
    }

    pub fn duty_of(&self, id: EntityId) -> Option<Duty> {
        self.duties.get(&id).copied()
    }

    pub fn has_duty(&self, id: EntityId) -> bool {
        self.duties.contains_key(&id)
    }

    pub fn is(&self, id: EntityId, duty: Duty) -> bool {
        self.duty_of(id) == Some(duty)
    }

    /// Members of `duty`, in id order.
    pub fn members(&self, duty: Duty) -> Vec<EntityId> {
        self.duties
            .iter()
            .filter(|(_, d)| **d == duty)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn count(&self, duty: Duty) -> usize {
        self.duties.values().filter(|d| **d == duty).count()
    }

    /// Drops every entity for which `keep` returns false. Returns how many
    /// were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(EntityId) -> bool) -> usize {
        let before = self.duties.len();
        self.duties.retain(|id, _| keep(*id));
        before - self.duties.len()
    }

    pub fn len(&self) -> usize {
        self.duties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duties_are_exclusive() {
        let mut duties = DutyMap::new();
        assert!(duties.assign(EntityId(1), Duty::Defender));
        assert!(!duties.assign(EntityId(1), Duty::Scout));
        assert!(duties.assign(EntityId(1), Duty::Defender));
        assert_eq!(duties.duty_of(EntityId(1)), Some(Duty::Defender));

        duties.release(EntityId(1));
        assert!(duties.assign(EntityId(1), Duty::Scout));
        assert_eq!(duties.count(Duty::Defender), 0);
        assert_eq!(duties.members(Duty::Scout), vec![EntityId(1)]);
    }

    #[test]
    fn test_retain_prunes_dead() {
        let mut duties = DutyMap::new();
        duties.assign(EntityId(1), Duty::Special);
        duties.assign(EntityId(2), Duty::Scout);
        assert_eq!(duties.retain(|id| id != EntityId(1)), 1);
        assert!(!duties.has_duty(EntityId(1)));
        assert!(duties.is(EntityId(2), Duty::Scout));
    }
}
