//! End-to-end controller behavior against an in-memory registry.

mod common;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use rts_ai::army::rally_point;
use rts_ai::{AiConfig, AiController, Behavior, DefenseState, Duty, BUILD_PHASES};
use rts_world::fixtures::ScriptedProduction;
use rts_world::{
    shared, AttackIntent, AttackMoveTags, BuildingDestroyed, Capabilities, EntityId,
    EntityKind, EntityRegistry, House, SpawnRequest, Treasury, Vec2,
};

use common::{run_until_ran, Skirmish, FOE, ME};

const BASE: Vec2 = Vec2 { x: 500.0, z: 500.0 };

/// A building losing health between two defense checks raises the alarm and
/// calls far-away fighters home with their attack orders dropped.
#[test]
fn test_base_damage_triggers_alarm_and_recall() {
    let mut s = Skirmish::new();
    let yard = s.building_with_health(ME, "ATConYard", BASE, 100.0, Capabilities::CONSTRUCTION);
    let far = s.unit(ME, "ATMinotaurus", Vec2::new(2500.0, 2500.0));
    let foe = s.unit(FOE, "HKAssault", Vec2::new(3600.0, 3600.0));
    s.world.set_attack_intent(far, AttackIntent::on(foe));

    let mut ai = s.controller(ME, House::Atreides);
    let tags = shared(AttackMoveTags::new());
    ai.set_combat(tags.clone());

    // First check only remembers health
    run_until_ran(&mut ai, &mut s.world, Behavior::Defense, 100);
    assert_eq!(ai.defense_state(), DefenseState::Calm);

    // 100 -> 90
    s.world.damage(yard, 10.0);
    run_until_ran(&mut ai, &mut s.world, Behavior::Defense, 100);
    assert!(ai.defense_state().is_under_attack());

    let row = s.world.get(far).unwrap();
    assert!(!row.attack_intent.active, "recalled unit should stop attacking");
    assert!(row.move_intent.active);
    assert_eq!(row.move_intent.target(), BASE);
}

/// Once the base has been quiet for the cooldown, healthy units near base
/// go after the remembered attackers and the main attack cooldown restarts.
#[test]
fn test_counterattack_after_calm_cooldown() {
    let mut s = Skirmish::new();
    s.building(ME, "ATConYard", BASE);
    let army: Vec<EntityId> = (0..6)
        .map(|i| s.unit(ME, "ATMinotaurus", Vec2::new(450.0 + i as f32 * 30.0, 650.0)))
        .collect();
    let raider = s.unit(FOE, "HKAssault", Vec2::new(700.0, 500.0));

    let mut ai = s.controller(ME, House::Atreides);
    let tags = shared(AttackMoveTags::new());
    ai.set_combat(tags.clone());

    run_until_ran(&mut ai, &mut s.world, Behavior::Defense, 100);
    assert!(ai.defense_state().is_under_attack());
    assert_eq!(ai.attacker_centroid(), Some(Vec2::new(700.0, 500.0)));

    s.world.kill(raider);
    for _ in 0..2000 {
        ai.update(&mut s.world, 1.0 / 30.0);
        if ai.defense_state() == DefenseState::Calm {
            break;
        }
    }
    assert_eq!(ai.defense_state(), DefenseState::Calm);

    let charging: Vec<EntityId> = army
        .iter()
        .copied()
        .filter(|id| {
            let row = s.world.get(*id).unwrap();
            row.move_intent.active && row.move_intent.target() == Vec2::new(700.0, 500.0)
        })
        .collect();
    assert!(charging.len() >= 3, "only {} units counterattacked", charging.len());
    assert!(charging.iter().all(|id| tags.borrow().is_tagged(*id)));
    // Part of the defender quota stays home.
    assert!(charging.len() < army.len());
    assert_eq!(ai.army().last_attack_tick(), Some(ai.tick()));
}

/// Three healthy units near base are enough to counterattack even when one
/// of them is a defender kept home, and the army cycle then waits a full
/// interval before touching the counterattackers.
#[test]
fn test_counterattack_counts_defenders_before_holdback() {
    let mut s = Skirmish::new();
    s.building(ME, "ATConYard", BASE);
    let army: Vec<EntityId> = (0..3)
        .map(|i| s.unit(ME, "ATMinotaurus", Vec2::new(450.0 + i as f32 * 30.0, 650.0)))
        .collect();
    let raider = s.unit(FOE, "HKAssault", Vec2::new(700.0, 500.0));

    let mut ai = s.controller(ME, House::Atreides);
    let tags = shared(AttackMoveTags::new());
    ai.set_combat(tags.clone());

    run_until_ran(&mut ai, &mut s.world, Behavior::Army, 100);
    assert!(ai.defense_state().is_under_attack());
    let defenders = ai.duties().members(Duty::Defender);
    assert_eq!(defenders.len(), 1);

    s.world.kill(raider);
    for _ in 0..2000 {
        ai.update(&mut s.world, 1.0 / 30.0);
        if ai.defense_state() == DefenseState::Calm {
            break;
        }
    }
    assert_eq!(ai.defense_state(), DefenseState::Calm);

    let centroid = Vec2::new(700.0, 500.0);
    let charging: Vec<EntityId> = army
        .iter()
        .copied()
        .filter(|id| {
            let row = s.world.get(*id).unwrap();
            row.move_intent.active && row.move_intent.target() == centroid
        })
        .collect();
    assert_eq!(charging.len(), 2);
    assert!(!charging.contains(&defenders[0]), "the defender should stay home");
    assert!(charging.iter().all(|id| tags.borrow().is_tagged(*id)));
    assert_eq!(ai.army().last_attack_tick(), Some(ai.tick()));
    assert_eq!(ai.status().attacking, 2);

    let hold = Behavior::Army.interval(&ai.config().schedule, ai.status().difficulty);
    assert!(ai.scheduler().next_tick(Behavior::Army) >= ai.tick() + hold);
}

/// An armed scout far from home is called back with everyone else when the
/// base is hit, and keeps its scouting duty.
#[test]
fn test_alarm_recalls_armed_scouts() {
    let mut s = Skirmish::new();
    let yard = s.building_with_health(ME, "HKConYard", BASE, 100.0, Capabilities::CONSTRUCTION);
    let buzzsaw = s.unit(ME, "HKBuzzsaw", Vec2::new(2500.0, 2500.0));

    let mut config = AiConfig::default();
    config.roles.scout_max_cost = 450.0;
    let mut ai = AiController::new(ME, House::Harkonnen, Rc::clone(&s.rules), config, 7);
    ai.set_type_table(s.types.clone());

    run_until_ran(&mut ai, &mut s.world, Behavior::Scout, 100);
    assert!(ai.duties().is(buzzsaw, Duty::Scout));
    assert_ne!(s.world.get(buzzsaw).unwrap().move_intent.target(), BASE);

    s.world.damage(yard, 10.0);
    run_until_ran(&mut ai, &mut s.world, Behavior::Defense, 100);
    assert!(ai.defense_state().is_under_attack());

    let row = s.world.get(buzzsaw).unwrap();
    assert!(row.move_intent.active);
    assert_eq!(row.move_intent.target(), BASE);
    assert!(ai.duties().is(buzzsaw, Duty::Scout));
}

/// Too few idle units to attack: they gather at the rally point and nobody
/// receives an attack order.
#[test]
fn test_small_army_rallies_instead_of_attacking() {
    let mut s = Skirmish::new();
    s.building(ME, "ATConYard", BASE);
    let units: Vec<EntityId> = (0..3)
        .map(|i| s.unit(ME, "ATMinotaurus", Vec2::new(400.0 + i as f32 * 20.0, 400.0)))
        .collect();

    let mut ai = s.controller(ME, House::Atreides);
    let tags = shared(AttackMoveTags::new());
    ai.set_combat(tags.clone());

    run_until_ran(&mut ai, &mut s.world, Behavior::Army, 200);

    let target = Vec2::new(4096.0 - BASE.x, 4096.0 - BASE.z);
    let rally = rally_point(BASE, target, ai.config().army.rally_distance);
    let mut rallied = 0;
    for id in &units {
        let row = s.world.get(*id).unwrap();
        assert!(!row.attack_intent.active);
        if ai.duties().is(*id, Duty::Defender) {
            continue;
        }
        assert_eq!(row.move_intent.target(), rally);
        rallied += 1;
    }
    assert!(rallied > 0);
    assert_eq!(ai.army().attacks_launched(), 0);
    assert!(tags.borrow().is_empty());
}

/// Over a long run the build cursor only moves forward, the composition goal
/// stays normalized and no unit holds two duties.
#[test]
fn test_long_run_invariants() {
    let mut s = Skirmish::new();
    s.building(ME, "ATConYard", BASE);
    s.building(FOE, "HKConYard", Vec2::new(3600.0, 3600.0));
    s.unit(ME, "ATScout", Vec2::new(520.0, 560.0));
    for i in 0..4 {
        s.unit(ME, "ATMinotaurus", Vec2::new(450.0 + i as f32 * 40.0, 420.0));
    }
    s.unit(ME, "ATEngineer", Vec2::new(560.0, 520.0));

    let mut ai = s.controller(ME, House::Atreides);
    let production = shared(ScriptedProduction::permissive());
    let treasury = shared(Treasury::with_starting_credits(&[ME, FOE], 10_000.0));
    ai.set_production(production.clone());
    ai.set_resources(treasury.clone());
    ai.set_combat(shared(AttackMoveTags::new()));

    let mut cursor = ai.build_cursor();
    for _ in 0..1500 {
        ai.update(&mut s.world, 1.0 / 30.0);

        assert!(ai.build_cursor() >= cursor, "build cursor moved backward");
        assert!(ai.build_cursor() <= BUILD_PHASES.len());
        cursor = ai.build_cursor();

        assert!((ai.goal().sum() - 1.0).abs() < 1e-4);

        let defenders: BTreeSet<EntityId> = ai.duties().members(Duty::Defender).into_iter().collect();
        let scouts: BTreeSet<EntityId> = ai.duties().members(Duty::Scout).into_iter().collect();
        let specials: BTreeSet<EntityId> = ai.duties().members(Duty::Special).into_iter().collect();
        assert!(defenders.is_disjoint(&scouts));
        assert!(defenders.is_disjoint(&specials));
        assert!(scouts.is_disjoint(&specials));
    }

    assert_eq!(ai.build_cursor(), BUILD_PHASES.len());
    let production = production.borrow();
    let first = &production.orders[0];
    assert_eq!(first.type_name, "ATSmWindtrap");
    assert!(first.is_building);
    assert!(first.site.is_some());
    assert!(!production.unit_orders().is_empty());

    let status = ai.status();
    assert_eq!(status.scouts, 1);
    assert_eq!(status.specials, 1);
    assert!(status.defenders >= 1);
}

/// Without a production authority, construction goes through the spawn
/// callback.
#[test]
fn test_spawn_callback_fallback() {
    let mut s = Skirmish::new();
    s.building(ME, "ATConYard", BASE);

    let mut ai = s.controller(ME, House::Atreides);
    let requests: Rc<RefCell<Vec<SpawnRequest>>> = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&requests);
    ai.set_spawn_callback(Box::new(move |request| {
        log.borrow_mut().push(request);
        Some(EntityId(10_000))
    }));

    run_until_ran(&mut ai, &mut s.world, Behavior::Build, 100);

    let requests = requests.borrow();
    let buildings: Vec<&SpawnRequest> = requests
        .iter()
        .filter(|r| r.kind == EntityKind::Building)
        .collect();
    assert_eq!(buildings.len(), 1);
    assert_eq!(buildings[0].type_name, "ATSmWindtrap");
    assert_eq!(buildings[0].owner, ME);
    // Training goes the same way.
    assert!(requests.iter().any(|r| r.kind == EntityKind::Unit));
    assert_eq!(ai.build_cursor(), 1);
}

/// Reconstruction skips the opening phases standing buildings already
/// cover, and a destroyed building leaves the placement record.
#[test]
fn test_reconstruct_and_building_loss() {
    let mut s = Skirmish::new();
    s.building(ME, "ATConYard", BASE);
    s.building(ME, "ATSmWindtrap", Vec2::new(300.0, 300.0));
    s.building(ME, "ATRefinery", Vec2::new(800.0, 400.0));
    let barracks_at = Vec2::new(600.0, 700.0);
    s.building(ME, "ATBarracks", barracks_at);

    let mut ai = s.controller(ME, House::Atreides);
    ai.reconstruct(&s.world, 5000);

    assert_eq!(ai.tick(), 5000);
    assert_eq!(ai.build_cursor(), 3);
    assert_eq!(ai.base_anchor(), Some(BASE));
    assert_eq!(ai.placement().placed().len(), 4);

    ai.on_building_destroyed(&BuildingDestroyed {
        owner: ME,
        position: barracks_at,
    });
    assert_eq!(ai.placement().placed().len(), 3);

    // Someone else's loss is not ours.
    ai.on_building_destroyed(&BuildingDestroyed {
        owner: FOE,
        position: BASE,
    });
    assert_eq!(ai.placement().placed().len(), 3);
}

/// Status snapshots serialize for the harness.
#[test]
fn test_status_serializes() {
    let mut s = Skirmish::new();
    s.building(ME, "ATConYard", BASE);
    let mut ai = s.controller(ME, House::Atreides);
    for _ in 0..20 {
        ai.update(&mut s.world, 1.0 / 30.0);
    }

    let json = serde_json::to_string(&ai.status()).unwrap();
    assert!(json.contains("\"house\":\"atreides\""));
    assert!(json.contains("\"state\":\"calm\""));
    let back: rts_ai::AiStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ai.status());
}
