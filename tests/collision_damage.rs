use std::cell::RefCell;
use std::rc::Rc;

use chopper::{
    components::{BoxCollider, Health, Projectile, Transform},
    config::Config,
    engine::{Engine, EngineBuilder},
    events::CollisionEvent,
    systems::{CollisionSystem, DamageSystem, ENEMIES_GROUP, PLAYER_TAG, PROJECTILES_GROUP},
    Entity,
};

fn engine() -> Engine {
    EngineBuilder::new(Config::default())
        .with_system(CollisionSystem::new())
        .with_system(DamageSystem::new())
        .build()
        .expect("engine builds")
}

fn collider(engine: &mut Engine, x: f64, y: f64, size: u32) -> Entity {
    let registry = engine.registry_mut();
    let entity = registry.create_entity();
    registry.add_component(entity, Transform::at(x, y)).unwrap();
    registry
        .add_component(entity, BoxCollider::new(size, size))
        .unwrap();
    entity
}

fn bullet(engine: &mut Engine, x: f64, y: f64, friendly: bool, damage: i32) -> Entity {
    let entity = collider(engine, x, y, 4);
    let registry = engine.registry_mut();
    registry.group_entity(entity, PROJECTILES_GROUP).unwrap();
    registry
        .add_component(
            entity,
            Projectile {
                friendly,
                damage,
                duration_ms: 5_000,
                start_ms: 0,
            },
        )
        .unwrap();
    entity
}

#[test]
fn overlapping_pair_publishes_one_event_and_destroys_at_sync() {
    let mut engine = engine();
    let player = collider(&mut engine, 100.0, 100.0, 32);
    engine.registry_mut().tag_entity(player, PLAYER_TAG).unwrap();
    engine
        .registry_mut()
        .add_component(player, Health::full(100))
        .unwrap();
    let shot = bullet(&mut engine, 110.0, 110.0, false, 10);
    let _bystander = collider(&mut engine, 400.0, 400.0, 32);

    // Runs after the damage handler: the bullet is doomed but still alive.
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    engine
        .events_mut()
        .subscribe::<CollisionEvent, _>(move |event, registry| {
            sink.borrow_mut().push((
                *event,
                registry.is_alive(event.b),
                registry.is_kill_pending(event.b),
            ));
            Ok(())
        });

    engine.frame(0.016, &[]).unwrap();

    let events = seen.borrow().clone();
    assert_eq!(
        events,
        vec![(CollisionEvent { a: player, b: shot }, true, true)]
    );
    let registry = engine.registry();
    assert!(!registry.is_alive(shot));
    assert_eq!(registry.get_component::<Health>(player).unwrap().current, 90);
    assert!(registry.entities_by_group(PROJECTILES_GROUP).unwrap().is_empty());

    engine.frame(0.016, &[]).unwrap();
    assert_eq!(seen.borrow().len(), 1);
    let stats = engine.registry().get_system::<DamageSystem>().unwrap().stats();
    assert_eq!((stats.player_hits, stats.enemy_hits, stats.kills), (1, 0, 0));
}

#[test]
fn friendly_fire_kills_enemy_and_frees_its_id() {
    let mut engine = engine();
    let enemy = collider(&mut engine, 0.0, 0.0, 32);
    engine
        .registry_mut()
        .group_entity(enemy, ENEMIES_GROUP)
        .unwrap();
    engine
        .registry_mut()
        .add_component(enemy, Health::full(15))
        .unwrap();
    let first = bullet(&mut engine, 5.0, 5.0, true, 10);

    engine.frame(0.016, &[]).unwrap();
    assert!(engine.registry().is_alive(enemy));
    assert!(!engine.registry().is_alive(first));

    let second = bullet(&mut engine, 5.0, 5.0, true, 10);
    assert_eq!(second, first, "freed ids are reused first");
    engine.frame(0.016, &[]).unwrap();

    let registry = engine.registry();
    assert!(!registry.is_alive(enemy));
    assert!(registry.is_free(enemy));
    assert!(!registry.entity_belongs_to_group(enemy, ENEMIES_GROUP));
    assert_eq!(registry.entity_count(), 0);
    let stats = registry.get_system::<DamageSystem>().unwrap().stats();
    assert_eq!((stats.enemy_hits, stats.kills), (2, 1));
}

fn hostile_shot_on_player(engine: &mut Engine) -> (Entity, Entity) {
    let player = collider(engine, 100.0, 100.0, 32);
    let registry = engine.registry_mut();
    registry.tag_entity(player, PLAYER_TAG).unwrap();
    registry.add_component(player, Health::full(100)).unwrap();
    let shot = bullet(engine, 110.0, 110.0, false, 30);
    (player, shot)
}

#[test]
fn removed_damage_system_stops_handling_collisions() {
    let mut engine = engine();
    engine
        .registry_mut()
        .remove_system::<DamageSystem>()
        .unwrap();
    let (player, shot) = hostile_shot_on_player(&mut engine);

    engine.frame(0.016, &[]).unwrap();

    let registry = engine.registry();
    assert_eq!(registry.get_component::<Health>(player).unwrap().current, 100);
    assert!(registry.is_alive(shot));
}

#[test]
fn damage_system_added_mid_game_handles_collisions() {
    let mut engine = EngineBuilder::new(Config::default())
        .with_system(CollisionSystem::new())
        .build()
        .expect("engine builds");
    engine.frame(0.016, &[]).unwrap();
    engine
        .registry_mut()
        .add_system(DamageSystem::new())
        .unwrap();
    let (player, shot) = hostile_shot_on_player(&mut engine);

    engine.frame(0.016, &[]).unwrap();

    let registry = engine.registry();
    assert_eq!(registry.get_component::<Health>(player).unwrap().current, 70);
    assert!(!registry.is_alive(shot));
    assert_eq!(
        registry.get_system::<DamageSystem>().unwrap().stats().player_hits,
        1
    );
}

#[test]
fn engine_swaps_damage_system_with_its_handler() {
    let mut engine = engine();
    engine.remove_system::<DamageSystem>().unwrap();
    engine.add_system(DamageSystem::new()).unwrap();
    assert_eq!(engine.events_mut().handler_count::<CollisionEvent>(), 1);

    let (player, _shot) = hostile_shot_on_player(&mut engine);
    engine.frame(0.016, &[]).unwrap();
    assert_eq!(
        engine
            .registry()
            .get_component::<Health>(player)
            .unwrap()
            .current,
        70
    );
}
