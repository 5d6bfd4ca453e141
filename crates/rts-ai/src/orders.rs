//! Intent writes with liveness and ownership checks.
//!
//! Entities can die or change hands between the census at the top of a tick
//! and the moment an order is written, so every write re-reads the row first.

use rts_world::{AttackIntent, EntityId, EntityRegistry, EntitySnapshot, MoveIntent, PlayerSlot, Vec2};

/// Current row for `id` if it is alive and owned by `owner`.
pub fn owned(world: &dyn EntityRegistry, owner: PlayerSlot, id: EntityId) -> Option<EntitySnapshot> {
    world.get(id).filter(|s| s.alive && s.owner == owner)
}

pub fn move_to(world: &mut dyn EntityRegistry, owner: PlayerSlot, id: EntityId, target: Vec2) -> bool {
    owned(world, owner, id).is_some() && world.set_move_intent(id, MoveIntent::to(target))
}

/// Targets `enemy` if it is still alive and hostile.
pub fn attack(
    world: &mut dyn EntityRegistry,
    owner: PlayerSlot,
    id: EntityId,
    enemy: EntityId,
) -> bool {
    let hostile = world
        .get(enemy)
        .map(|e| e.alive && owner.is_hostile_to(e.owner))
        .unwrap_or(false);
    hostile && owned(world, owner, id).is_some() && world.set_attack_intent(id, AttackIntent::on(enemy))
}

/// Clears both intents.
pub fn halt(world: &mut dyn EntityRegistry, owner: PlayerSlot, id: EntityId) -> bool {
    owned(world, owner, id).is_some()
        && world.set_move_intent(id, MoveIntent::cleared())
        && world.set_attack_intent(id, AttackIntent::cleared())
}

/// Clears the attack intent and heads for `target`.
pub fn recall(world: &mut dyn EntityRegistry, owner: PlayerSlot, id: EntityId, target: Vec2) -> bool {
    halt(world, owner, id) && world.set_move_intent(id, MoveIntent::to(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rts_world::{Capabilities, ColumnarRegistry, EntityKind, NewEntity};

    fn spawn(reg: &mut ColumnarRegistry, owner: u8) -> EntityId {
        reg.spawn(NewEntity {
            kind: EntityKind::Unit,
            owner: PlayerSlot(owner),
            type_index: 0,
            position: Vec2::ZERO,
            max_health: 100.0,
            caps: Capabilities::MOBILE | Capabilities::ARMED,
        })
    }

    #[test]
    fn test_orders_check_ownership() {
        let mut reg = ColumnarRegistry::new();
        let mine = spawn(&mut reg, 1);
        let theirs = spawn(&mut reg, 2);
        let me = PlayerSlot(1);

        assert!(move_to(&mut reg, me, mine, Vec2::new(1.0, 1.0)));
        assert!(!move_to(&mut reg, me, theirs, Vec2::new(1.0, 1.0)));
        assert!(attack(&mut reg, me, mine, theirs));
        // Can't attack your own units.
        assert!(!attack(&mut reg, me, mine, mine));
    }

    #[test]
    fn test_orders_skip_dead_entities() {
        let mut reg = ColumnarRegistry::new();
        let mine = spawn(&mut reg, 1);
        let theirs = spawn(&mut reg, 2);
        let me = PlayerSlot(1);

        reg.kill(theirs);
        assert!(!attack(&mut reg, me, mine, theirs));
        reg.kill(mine);
        assert!(!recall(&mut reg, me, mine, Vec2::ZERO));
    }

    #[test]
    fn test_recall_clears_attack() {
        let mut reg = ColumnarRegistry::new();
        let mine = spawn(&mut reg, 1);
        let theirs = spawn(&mut reg, 2);
        let me = PlayerSlot(1);

        attack(&mut reg, me, mine, theirs);
        assert!(recall(&mut reg, me, mine, Vec2::new(9.0, 9.0)));
        let row = reg.get(mine).unwrap();
        assert!(!row.attack_intent.active);
        assert_eq!(row.move_intent.target(), Vec2::new(9.0, 9.0));
    }
}
