use std::path::PathBuf;

use bevy::prelude::*;

use crate::animation::AnimationLibrary;
use crate::camera::{ScreenShake, Scroll};
use crate::components::{Enemy, GamePos, Player, Rect, TileKind};
use crate::enemy::{EnemyAnim, EnemyState};
use crate::flow::GameFlow;
use crate::particles::LeafSpawners;
use crate::physics_core::Body;
use crate::player::{PlayerAnim, PlayerState};
use crate::tilemap::Tilemap;

const ENTITY_SIZE: Vec2 = Vec2::new(8.0, 15.0);
/// Where the player stands if the map carries no spawn marker.
const FALLBACK_SPAWN: Vec2 = Vec2::new(50.0, 50.0);

/// Leaf emitter zone carved out of a large-decor tree anchor.
fn leaf_zone(anchor: (f32, f32)) -> Rect {
    Rect::new(anchor.0 + 4.0, anchor.1 + 4.0, 23.0, 13.0)
}

#[derive(Resource, Clone)]
pub struct MapPath(pub PathBuf);

impl Default for MapPath {
    fn default() -> Self {
        Self(PathBuf::from("map.json"))
    }
}

/// Death and restart bookkeeping. `dead` of zero means alive; once it starts
/// counting, the wipe begins at 10 and the level reloads past 40.
/// `transition` runs the circular wipe: -30 opening up to 0, 0 up to +30
/// closing down.
#[derive(Resource, Default, Clone, Copy)]
pub struct LevelState {
    pub dead: u32,
    pub transition: i32,
    pub pending_reload: bool,
    pub loaded: bool,
    /// Bumped on every reload so render-side caches resynchronize.
    pub generation: u64,
}

/// Run condition: the player only updates while alive.
pub fn player_alive(level: Res<LevelState>) -> bool {
    level.dead == 0
}

pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(LevelState::default())
            .insert_resource(LeafSpawners::default())
            .add_systems(OnEnter(GameFlow::Playing), request_initial_load);
    }
}

fn request_initial_load(mut level: ResMut<LevelState>) {
    if !level.loaded {
        level.loaded = true;
        level.pending_reload = true;
    }
}

/// Drives the death fade: the wipe starts once the counter passes 10 and the
/// level reloads once it passes 40. The opening wipe always ticks toward 0.
pub fn tick_death_and_transition(mut level: ResMut<LevelState>) {
    if level.transition < 0 {
        level.transition += 1;
    }
    if level.dead > 0 {
        level.dead += 1;
        if level.dead >= 10 {
            level.transition = (level.transition + 1).min(30);
        }
        if level.dead > 40 {
            level.pending_reload = true;
        }
    }
}

/// (Re)load the level: read the map, pull spawn markers and leaf anchors out
/// of it, clear every transient entity and respawn the roster.
pub fn reload_level(
    mut commands: Commands,
    map_path: Res<MapPath>,
    library: Res<AnimationLibrary>,
    mut tilemap: ResMut<Tilemap>,
    mut level: ResMut<LevelState>,
    mut scroll: ResMut<Scroll>,
    mut shake: ResMut<ScreenShake>,
    mut leaf_spawners: ResMut<LeafSpawners>,
    transient: Query<
        Entity,
        Or<(
            With<Player>,
            With<Enemy>,
            With<GamePos>,
        )>,
    >,
) {
    if !level.pending_reload {
        return;
    }
    level.pending_reload = false;

    for entity in transient.iter() {
        commands.entity(entity).despawn();
    }

    *tilemap = match Tilemap::load(&map_path.0) {
        Ok(Some(map)) => map,
        Ok(None) => {
            info!("no saved map at {}, starting empty", map_path.0.display());
            Tilemap::new(16)
        }
        Err(err) => {
            error!("unusable map {}: {err}", map_path.0.display());
            std::process::exit(2);
        }
    };

    let mut player_spawn = FALLBACK_SPAWN;
    let mut enemy_spawns = Vec::new();
    for marker in tilemap.extract(&[(TileKind::Spawners, 0), (TileKind::Spawners, 1)], false) {
        let pos = Vec2::new(marker.pos.0, marker.pos.1);
        if marker.variant == 0 {
            player_spawn = pos;
        } else {
            enemy_spawns.push(pos);
        }
    }
    leaf_spawners.0 = tilemap
        .extract(&[(TileKind::LargeDecor, 2)], true)
        .into_iter()
        .map(|tree| leaf_zone(tree.pos))
        .collect();

    commands.spawn((
        Player,
        Body::new(player_spawn, ENTITY_SIZE),
        PlayerState::default(),
        PlayerAnim::new(&library),
    ));
    for pos in enemy_spawns {
        commands.spawn((
            Enemy,
            Body::new(pos, ENTITY_SIZE),
            EnemyState::default(),
            EnemyAnim::new(&library),
        ));
    }

    level.dead = 0;
    level.transition = -30;
    level.generation += 1;
    scroll.pos = Vec2::ZERO;
    shake.0 = 0.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationLibrary;
    use bevy::ecs::system::RunSystemOnce;

    fn level_world(map: Tilemap) -> World {
        let mut world = World::new();
        world.insert_resource(MapPath::default());
        world.insert_resource(AnimationLibrary::default());
        world.insert_resource(map);
        world.insert_resource(LevelState::default());
        world.insert_resource(Scroll::default());
        world.insert_resource(ScreenShake::default());
        world.insert_resource(LeafSpawners::default());
        world
    }

    #[test]
    fn death_counter_schedules_wipe_then_reload() {
        let mut world = level_world(Tilemap::new(16));
        {
            let mut level = world.resource_mut::<LevelState>();
            level.dead = 1;
            level.transition = 0;
        }
        let mut wipe_started_at = None;
        for _ in 0..60 {
            world
                .run_system_once(tick_death_and_transition)
                .expect("tick");
            let level = *world.resource::<LevelState>();
            if level.transition > 0 && wipe_started_at.is_none() {
                wipe_started_at = Some(level.dead);
            }
            if level.pending_reload {
                break;
            }
        }
        let level = *world.resource::<LevelState>();
        assert_eq!(wipe_started_at, Some(10));
        assert_eq!(level.dead, 41);
        assert!(level.pending_reload);
    }

    #[test]
    fn opening_transition_ticks_toward_zero() {
        let mut world = level_world(Tilemap::new(16));
        world.resource_mut::<LevelState>().transition = -30;
        for _ in 0..35 {
            world
                .run_system_once(tick_death_and_transition)
                .expect("tick");
        }
        assert_eq!(world.resource::<LevelState>().transition, 0);
    }

    #[test]
    fn reload_extracts_spawners_and_leaf_zones() {
        // Loading from a missing path keeps the empty map; seed the markers
        // by saving a map to a temp file first.
        let mut map = Tilemap::new(16);
        map.insert(TileKind::Spawners, 0, (2, 1));
        map.insert(TileKind::Spawners, 1, (5, 1));
        map.insert_offgrid(TileKind::LargeDecor, 2, (64.0, 32.0));
        let path = std::env::temp_dir().join("ember_level_reload_test.json");
        map.save(&path).expect("save");

        let mut world = level_world(Tilemap::new(16));
        world.insert_resource(MapPath(path.clone()));
        world.resource_mut::<LevelState>().pending_reload = true;

        world.run_system_once(reload_level).expect("reload");
        std::fs::remove_file(&path).ok();

        let mut players = world.query::<(&Body, &PlayerState)>();
        let (body, _) = players.single(&world);
        assert_eq!(body.pos, Vec2::new(32.0, 16.0));
        let mut enemies = world.query::<(&Body, &EnemyState)>();
        let enemy_positions: Vec<Vec2> =
            enemies.iter(&world).map(|(b, _)| b.pos).collect();
        assert_eq!(enemy_positions, vec![Vec2::new(80.0, 16.0)]);

        let spawners = world.resource::<LeafSpawners>();
        assert_eq!(spawners.0, vec![Rect::new(68.0, 36.0, 23.0, 13.0)]);

        // Markers must be gone from the loaded map, the tree must remain.
        let tilemap = world.resource::<Tilemap>();
        assert_eq!(tilemap.grid_len(), 0);
        assert_eq!(tilemap.offgrid.len(), 1);

        let level = world.resource::<LevelState>();
        assert_eq!(level.transition, -30);
        assert_eq!(level.generation, 1);
        assert!(!level.pending_reload);
    }

    #[test]
    fn reload_with_missing_map_starts_empty() {
        let mut world = level_world(Tilemap::new(16));
        world.insert_resource(MapPath(std::env::temp_dir().join("ember_no_such_map.json")));
        world.resource_mut::<LevelState>().pending_reload = true;

        world.run_system_once(reload_level).expect("reload");

        assert_eq!(world.resource::<Tilemap>().grid_len(), 0);
        let mut players = world.query::<&Body>();
        assert_eq!(players.single(&world).pos, FALLBACK_SPAWN);
    }
}
