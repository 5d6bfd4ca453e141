//! Base alarm: recall on damage, engage with defenders, counterattack when
//! things quiet down.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use rts_world::{Capabilities, EntityId, EntitySnapshot, Vec2};

use crate::army::{defender_quota, ArmyPlanner};
use crate::context::TickContext;
use crate::duties::{Duty, DutyMap};
use crate::error::AiError;
use crate::orders;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum DefenseState {
    Calm,
    UnderAttack { since: u64 },
}

impl DefenseState {
    pub fn is_under_attack(&self) -> bool {
        matches!(self, DefenseState::UnderAttack { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefenseEvent {
    Quiet,
    /// Entered the alarm and called units home.
    Alarm { recalled: usize },
    Engaged { defenders: usize },
    /// Left the alarm. `counterattack` is how many units went after the
    /// attackers.
    StoodDown { counterattack: usize },
}

#[derive(Debug, Clone)]
pub struct BaseDefense {
    state: DefenseState,
    last_damage_tick: u64,
    health_memory: BTreeMap<EntityId, f32>,
    attacker_centroid: Option<Vec2>,
}

impl Default for BaseDefense {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseDefense {
    pub fn new() -> Self {
        Self {
            state: DefenseState::Calm,
            last_damage_tick: 0,
            health_memory: BTreeMap::new(),
            attacker_centroid: None,
        }
    }

    pub fn state(&self) -> DefenseState {
        self.state
    }

    pub fn attacker_centroid(&self) -> Option<Vec2> {
        self.attacker_centroid
    }

    /// Compares building health with the previous check. A building that is
    /// gone counts as damaged.
    fn took_damage(&mut self, buildings: &[EntitySnapshot]) -> bool {
        let mut damaged = false;
        let mut current = BTreeMap::new();
        for b in buildings {
            if let Some(before) = self.health_memory.get(&b.id) {
                if b.health < *before {
                    damaged = true;
                }
            }
            current.insert(b.id, b.health);
        }
        if self.health_memory.keys().any(|id| !current.contains_key(id)) {
            damaged = true;
        }
        self.health_memory = current;
        damaged
    }

    pub fn step(
        &mut self,
        ctx: &mut TickContext<'_>,
        duties: &DutyMap,
        army: &mut ArmyPlanner,
        base: Vec2,
    ) -> Result<DefenseEvent, AiError> {
        let config = ctx.config;
        let cfg = &config.defense;
        let damaged = self.took_damage(&ctx.census.own_buildings);
        let threats = ctx.hostile_units_near(base, cfg.threat_radius);
        if damaged || !threats.is_empty() {
            self.last_damage_tick = ctx.tick;
        }

        match self.state {
            DefenseState::Calm if damaged || !threats.is_empty() => {
                self.state = DefenseState::UnderAttack { since: ctx.tick };
                let recalled = self.recall(ctx, duties, army, base);
                tracing::info!(
                    "{}: base under attack ({} hostiles near), recalled {} units",
                    ctx.slot(),
                    threats.len(),
                    recalled
                );
                self.engage(ctx, duties, base);
                Ok(DefenseEvent::Alarm { recalled })
            }
            DefenseState::Calm => {
                self.send_defenders_home(ctx, duties, base);
                Ok(DefenseEvent::Quiet)
            }
            DefenseState::UnderAttack { .. } if ctx.tick >= self.last_damage_tick + cfg.calm_cooldown => {
                self.state = DefenseState::Calm;
                let counterattack = self.counterattack(ctx, duties, army, base);
                tracing::info!(
                    "{}: base calm again, counterattacking with {} units",
                    ctx.slot(),
                    counterattack
                );
                Ok(DefenseEvent::StoodDown { counterattack })
            }
            DefenseState::UnderAttack { .. } => {
                let defenders = self.engage(ctx, duties, base);
                Ok(DefenseEvent::Engaged { defenders })
            }
        }
    }

    /// Calls every combat unit except defenders back from beyond the recall
    /// radius, dropping whatever it was doing. Armed scouts come home too.
    fn recall(&mut self, ctx: &mut TickContext<'_>, duties: &DutyMap, army: &mut ArmyPlanner, base: Vec2) -> usize {
        let slot = ctx.slot();
        let radius_sq = ctx.config.defense.recall_radius * ctx.config.defense.recall_radius;
        let far: Vec<EntityId> = ctx
            .census
            .own_units
            .iter()
            .filter(|u| u.is_combatant())
            .filter(|u| !duties.is(u.id, Duty::Defender))
            .filter(|u| u.position.distance_sq(&base) > radius_sq)
            .map(|u| u.id)
            .collect();
        let mut recalled = Vec::new();
        for id in far {
            if orders::recall(ctx.world, slot, id, base) {
                army.forget(id);
                recalled.push(id);
            }
        }
        ctx.services.clear_attack_move(&recalled);
        recalled.len()
    }

    /// Points unengaged defenders at the closest hostile near the base.
    fn engage(&mut self, ctx: &mut TickContext<'_>, duties: &DutyMap, base: Vec2) -> usize {
        let slot = ctx.slot();
        let hostiles = ctx.hostile_units_near(base, ctx.config.defense.engage_radius);
        if let Some(centroid) = Vec2::centroid(hostiles.iter().map(|h| h.position)) {
            self.attacker_centroid = Some(centroid);
        }
        if hostiles.is_empty() {
            return 0;
        }
        let mut engaged = 0;
        for id in duties.members(Duty::Defender) {
            let Some(row) = orders::owned(ctx.world, slot, id) else {
                continue;
            };
            if row.attack_intent.active {
                continue;
            }
            let nearest = hostiles
                .iter()
                .min_by(|a, b| {
                    a.position
                        .distance_sq(&row.position)
                        .total_cmp(&b.position.distance_sq(&row.position))
                })
                .map(|h| h.id);
            if let Some(enemy) = nearest {
                if orders::attack(ctx.world, slot, id, enemy) {
                    engaged += 1;
                }
            }
        }
        engaged
    }

    fn send_defenders_home(&self, ctx: &mut TickContext<'_>, duties: &DutyMap, base: Vec2) {
        let slot = ctx.slot();
        let radius = ctx.config.defense.recall_radius;
        for id in duties.members(Duty::Defender) {
            let Some(row) = orders::owned(ctx.world, slot, id) else {
                continue;
            };
            if row.is_idle() && row.position.distance(&base) > radius {
                orders::move_to(ctx.world, slot, id, base);
            }
        }
    }

    /// Sends healthy units near base after the attackers, keeping part of
    /// the defender quota home. Returns how many went.
    fn counterattack(
        &mut self,
        ctx: &mut TickContext<'_>,
        duties: &DutyMap,
        army: &mut ArmyPlanner,
        base: Vec2,
    ) -> usize {
        let config = ctx.config;
        let slot = ctx.slot();
        let near_sq = config.army.near_base_radius * config.army.near_base_radius;
        let army_size = ctx
            .census
            .own_units
            .iter()
            .filter(|u| u.is_combatant() && !duties.is(u.id, Duty::Scout) && !duties.is(u.id, Duty::Special))
            .count();
        let quota = defender_quota(army_size, &config.army, ctx.difficulty(), ctx.personality());
        let keep_home = (quota as f32 * config.defense.holdback).ceil() as usize;

        let mut healthy: Vec<EntitySnapshot> = ctx
            .census
            .own_units
            .iter()
            .filter_map(|u| orders::owned(&*ctx.world, slot, u.id))
            .filter(|u| u.is_combatant() && u.has(Capabilities::MOBILE))
            .filter(|u| !duties.is(u.id, Duty::Scout) && !duties.is(u.id, Duty::Special))
            .filter(|u| u.health_fraction() > config.defense.healthy_fraction)
            .filter(|u| u.position.distance_sq(&base) <= near_sq)
            .collect();
        healthy.sort_by_key(|u| u.id);

        let target = self.attacker_centroid.take().unwrap_or(ctx.target);
        if healthy.len() < config.defense.counterattack_min_units {
            return 0;
        }
        let mut kept = 0;
        healthy.retain(|u| {
            if duties.is(u.id, Duty::Defender) && kept < keep_home {
                kept += 1;
                false
            } else {
                true
            }
        });

        let mut sent = Vec::new();
        for unit in &healthy {
            if orders::move_to(ctx.world, slot, unit.id, target) {
                sent.push(unit.id);
            }
        }
        if sent.is_empty() {
            return 0;
        }
        ctx.services.tag_attack_move(&sent);
        army.enlist(&sent);
        army.reset_cooldown(ctx.tick);
        sent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rts_world::{AttackIntent, EntityKind, MoveIntent, PlayerSlot};

    fn building(id: u32, health: f32) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId(id),
            kind: EntityKind::Building,
            owner: PlayerSlot(1),
            type_index: 0,
            position: Vec2::new(500.0, 500.0),
            health,
            max_health: 100.0,
            move_intent: MoveIntent::cleared(),
            attack_intent: AttackIntent::cleared(),
            caps: Capabilities::empty(),
            alive: true,
        }
    }

    #[test]
    fn test_first_check_only_remembers() {
        let mut defense = BaseDefense::new();
        assert!(!defense.took_damage(&[building(1, 100.0)]));
        assert!(!defense.took_damage(&[building(1, 100.0)]));
    }

    #[test]
    fn test_health_drop_is_damage() {
        let mut defense = BaseDefense::new();
        defense.took_damage(&[building(1, 100.0), building(2, 100.0)]);
        assert!(defense.took_damage(&[building(1, 90.0), building(2, 100.0)]));
        // Repairs are not damage.
        assert!(!defense.took_damage(&[building(1, 95.0), building(2, 100.0)]));
    }

    #[test]
    fn test_lost_building_is_damage() {
        let mut defense = BaseDefense::new();
        defense.took_damage(&[building(1, 100.0), building(2, 100.0)]);
        assert!(defense.took_damage(&[building(1, 100.0)]));
    }
}
