use keybound_core::{CellCoord, Command, Element, EnemyId, Event, PawnId, MAX_PLAYERS};
use keybound_system_enemy_ai::{Config, EnemyAi, GoalKind};
use keybound_world::{
    self as world,
    map::{ENEMY_SPAWN_LAYER, KEYS_LAYER, LOOT_LAYER, PAWN_SPAWN_LAYER, TERRAIN_LAYER},
    query::{self, Collectible},
    CardCatalog, EnemySpec, EntitySpec, KeyCatalog, MapAsset, MatchSetup, World,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

const ENEMY: EnemyId = EnemyId::new(0);
const ALWAYS: [f64; MAX_PLAYERS as usize] = [1.0; MAX_PLAYERS as usize];

#[test]
fn adjacent_pawn_is_struck_before_moving() {
    let mut world = board(CellCoord::new(2, 2), CellCoord::new(3, 2), true);
    let mut ai = EnemyAi::new(Config::new(1).with_control_table(ALWAYS));

    let commands = enemy_turn(&mut ai, &world);
    assert_eq!(
        commands.first(),
        Some(&Command::EnemyAttack {
            enemy: ENEMY,
            pawn: PawnId::new(0),
        }),
        "the strike comes first"
    );
    assert!(
        !commands
            .iter()
            .any(|command| matches!(command, Command::MoveEnemy { .. })),
        "a chasing enemy already next to its target stays put: {commands:?}"
    );

    let _ = run(&mut world, commands);
    assert_eq!(query::pawn_view(&world)[0].health, 80);
}

#[test]
fn chasing_enemy_closes_in_one_step_per_turn() {
    let mut world = board(CellCoord::new(0, 0), CellCoord::new(6, 0), true);
    let mut ai = EnemyAi::new(Config::new(9).with_control_table(ALWAYS).with_decay(0.0));

    for expected in (1..=5).rev() {
        let commands = enemy_turn(&mut ai, &world);
        let _ = run(&mut world, commands);
        let enemy = &query::enemy_view(&world)[0];
        assert_eq!(
            enemy.cell.manhattan_distance(CellCoord::new(0, 0)),
            expected,
            "enemy should be one step closer"
        );
    }
    assert_eq!(
        ai.goal(ENEMY).map(|goal| goal.kind()),
        Some(GoalKind::ChasePlayer)
    );
}

#[test]
fn chasing_enemy_routes_around_walls() {
    let mut asset = asset(CellCoord::new(0, 0), CellCoord::new(2, 0));
    asset
        .set_tile(TERRAIN_LAYER, CellCoord::new(1, 0), 50)
        .expect("in bounds");
    asset
        .set_tile(TERRAIN_LAYER, CellCoord::new(1, 1), 50)
        .expect("in bounds");
    asset.set_tile_property(50, "walkable", json!(false));
    let mut world = build(&asset, true);
    let mut ai = EnemyAi::new(Config::new(4).with_control_table(ALWAYS).with_decay(0.0));

    let commands = enemy_turn(&mut ai, &world);
    assert_eq!(
        commands,
        vec![Command::MoveEnemy {
            enemy: ENEMY,
            to: CellCoord::new(2, 1),
        }]
    );
    let _ = run(&mut world, commands);
}

#[test]
fn loot_in_a_corridor_does_not_stall_the_chase() {
    let card_cell = CellCoord::new(5, 1);
    let key_cell = CellCoord::new(3, 1);
    let mut asset = MapAsset::new(7, 7);
    asset
        .set_tile(PAWN_SPAWN_LAYER, CellCoord::new(0, 1), 1)
        .expect("in bounds");
    asset
        .set_tile(ENEMY_SPAWN_LAYER, CellCoord::new(6, 1), 1)
        .expect("in bounds");
    for column in 0..7 {
        for row in [0, 2] {
            asset
                .set_tile(TERRAIN_LAYER, CellCoord::new(column, row), 50)
                .expect("in bounds");
        }
    }
    asset.set_tile_property(50, "walkable", json!(false));
    asset
        .set_tile(LOOT_LAYER, CellCoord::new(5, 1), 30)
        .expect("in bounds");
    asset
        .set_tile(KEYS_LAYER, CellCoord::new(3, 1), 11)
        .expect("in bounds");
    for (row, gid) in (4..7).zip(12..) {
        asset
            .set_tile(KEYS_LAYER, CellCoord::new(0, row), gid)
            .expect("in bounds");
    }
    let mut world = build(&asset, true);
    let mut ai = EnemyAi::new(Config::new(2).with_control_table(ALWAYS).with_decay(0.0));
    let key = item_at(&world, key_cell).expect("key spawned in the corridor");
    assert!(item_at(&world, card_cell).is_some(), "card spawned in the corridor");

    let commands = enemy_turn(&mut ai, &world);
    assert_eq!(
        commands,
        vec![Command::MoveEnemy {
            enemy: ENEMY,
            to: card_cell,
        }]
    );
    let events = run(&mut world, commands);
    assert!(
        events
            .iter()
            .any(|event| matches!(event, Event::CardDestroyed { cell, .. } if *cell == card_cell)),
        "the card under the enemy is destroyed: {events:?}"
    );
    assert_eq!(item_at(&world, card_cell), None);

    for column in (1..=4).rev() {
        let commands = enemy_turn(&mut ai, &world);
        let _ = run(&mut world, commands);
        assert_eq!(
            query::enemy_view(&world)[0].cell,
            CellCoord::new(column, 1),
            "one step per turn along the corridor"
        );
        let expected = (column != 3).then_some(key);
        assert_eq!(item_at(&world, key_cell), expected, "key is covered only while stepped on");
    }
}

#[test]
fn wandering_enemy_takes_a_free_cardinal_step() {
    let world = board(CellCoord::new(0, 0), CellCoord::new(4, 4), false);
    let mut ai = EnemyAi::new(Config::new(21));

    for _ in 0..10 {
        let commands = enemy_turn(&mut ai, &world);
        let [Command::MoveEnemy { enemy, to }] = commands.as_slice() else {
            panic!("expected a single step, got {commands:?}");
        };
        assert_eq!(*enemy, ENEMY);
        assert!(CellCoord::new(4, 4).is_adjacent(*to));
        assert!(ai.goal(ENEMY).is_none(), "wandering never touches the goal");
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let first = replay(17);
    let second = replay(17);
    assert_eq!(first, second);
}

fn replay(seed: u64) -> Vec<CellCoord> {
    let mut world = board(CellCoord::new(0, 0), CellCoord::new(6, 6), true);
    let mut ai = EnemyAi::new(Config::new(seed));
    let mut trail = Vec::new();
    for _ in 0..12 {
        let commands = enemy_turn(&mut ai, &world);
        let _ = run(&mut world, commands);
        if let Some(enemy) = query::enemy_view(&world).first() {
            trail.push(enemy.cell);
        }
    }
    trail
}

fn enemy_turn(ai: &mut EnemyAi, world: &World) -> Vec<Command> {
    let enemy = query::enemy_view(world)
        .into_iter()
        .find(|enemy| enemy.id == ENEMY)
        .expect("enemy is alive");
    let pawns = query::pawn_view(world);
    let collectibles = query::collectible_view(world);
    let mut commands = Vec::new();
    ai.handle(
        &enemy,
        &pawns,
        &collectibles,
        query::grid(world),
        query::player_count(world),
        &mut commands,
    );
    commands
}

fn run(world: &mut World, commands: Vec<Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::ActionRejected { .. })),
        "world refused an AI command: {events:?}"
    );
    events
}

fn item_at(world: &World, cell: CellCoord) -> Option<Collectible> {
    query::collectible_view(world)
        .into_iter()
        .find(|item| item.cell == cell)
        .map(|item| item.item)
}

fn board(pawn: CellCoord, enemy: CellCoord, ai_controlled: bool) -> World {
    build(&asset(pawn, enemy), ai_controlled)
}

fn asset(pawn_cell: CellCoord, enemy_cell: CellCoord) -> MapAsset {
    let mut asset = MapAsset::new(7, 7);
    asset
        .set_tile(PAWN_SPAWN_LAYER, pawn_cell, 1)
        .expect("in bounds");
    asset
        .set_tile(ENEMY_SPAWN_LAYER, enemy_cell, 1)
        .expect("in bounds");
    for (row, gid) in (3..7).zip(11..) {
        asset
            .set_tile(KEYS_LAYER, CellCoord::new(0, row), gid)
            .expect("in bounds");
    }
    asset
}

fn build(asset: &MapAsset, ai_controlled: bool) -> World {
    let setup = MatchSetup {
        pawns: vec![EntitySpec::new("Gork", 100, 20, Element::Neutral)],
        enemies: vec![EnemySpec {
            stats: EntitySpec::new("Skeleton", 100, 20, Element::Neutral),
            ai_controlled,
        }],
        ..MatchSetup::standard(1)
    };
    World::new(
        asset,
        &setup,
        CardCatalog::standard().expect("standard catalog"),
        KeyCatalog::standard(),
        &mut ChaCha8Rng::seed_from_u64(3),
    )
    .expect("valid board")
}
