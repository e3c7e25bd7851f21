use bevy::prelude::*;
use rand::Rng;

use crate::animation::{AnimKey, Animation, AnimationLibrary};
use crate::audio::{PlaySfx, Sfx};
use crate::camera::ScreenShake;
use crate::components::{Enemy, EnemyAction, GameConfig, Player, SimRng};
use crate::particles::spawn_hit_burst;
use crate::physics_core::{step_body, Body};
use crate::player::PlayerState;
use crate::projectile::spawn_projectile;
use crate::spark::spawn_spark;
use crate::tilemap::Tilemap;

/// Chance per idle tick that an enemy starts a patrol leg.
const WALK_CHANCE: f32 = 0.01;
/// Vertical alignment window for taking a shot at the player.
const AIM_SLACK: f32 = 16.0;
/// How far ahead of the gun barrel projectiles and muzzle sparks appear.
const MUZZLE_OFFSET: f32 = 7.0;
/// Probe point below-and-ahead of the enemy for ledge sensing.
const LEDGE_PROBE_DOWN: f32 = 23.0;

#[derive(Component, Clone, Debug, Default)]
pub struct EnemyState {
    /// Remaining ticks of the current patrol leg; zero means idling.
    pub walking: u32,
}

#[derive(Component)]
pub struct EnemyAnim {
    pub action: EnemyAction,
    pub anim: Animation,
}

impl EnemyAnim {
    pub fn new(library: &AnimationLibrary) -> Self {
        Self {
            action: EnemyAction::Idle,
            anim: library.instantiate(AnimKey::Enemy(EnemyAction::Idle)),
        }
    }

    pub fn set(&mut self, action: EnemyAction, library: &AnimationLibrary) {
        if action != self.action {
            self.action = action;
            self.anim = library.instantiate(AnimKey::Enemy(action));
        }
    }
}

/// Whether an aligned enemy facing `flip` actually has the player downrange.
pub fn firing_alignment(flip: bool, delta: Vec2) -> bool {
    delta.y.abs() < AIM_SLACK && ((flip && delta.x < 0.0) || (!flip && delta.x > 0.0))
}

pub fn update_enemies(
    config: Res<GameConfig>,
    tilemap: Res<Tilemap>,
    library: Res<AnimationLibrary>,
    mut rng: ResMut<SimRng>,
    mut shake: ResMut<ScreenShake>,
    mut sfx: EventWriter<PlaySfx>,
    mut commands: Commands,
    mut enemies: Query<(Entity, &mut Body, &mut EnemyState, &mut EnemyAnim), With<Enemy>>,
    player: Query<(&Body, &PlayerState), (With<Player>, Without<Enemy>)>,
) {
    use std::f32::consts::PI;
    let player = player.get_single().ok();

    for (entity, mut body, mut state, mut anim) in enemies.iter_mut() {
        let mut movement = Vec2::ZERO;
        if state.walking > 0 {
            // Keep walking only while there's floor ahead and no wall in the
            // face; otherwise turn around on the spot.
            let ahead = if body.flip {
                -MUZZLE_OFFSET
            } else {
                MUZZLE_OFFSET
            };
            let probe = (body.center().x + ahead, body.pos.y + LEDGE_PROBE_DOWN);
            if !body.collisions.right && !body.collisions.left && tilemap.solid_check(probe) {
                movement.x = if body.flip {
                    -config.enemy_speed
                } else {
                    config.enemy_speed
                };
            } else {
                body.flip = !body.flip;
            }
            state.walking -= 1;

            // The tick the patrol leg ends is the one chance to shoot.
            if state.walking == 0 {
                if let Some((player_body, _)) = player {
                    let delta = player_body.pos - body.pos;
                    if firing_alignment(body.flip, delta) {
                        sfx.send(PlaySfx(Sfx::Shoot));
                        let barrel = if body.flip {
                            -MUZZLE_OFFSET
                        } else {
                            MUZZLE_OFFSET
                        };
                        let muzzle = Vec2::new(
                            body.center().x + barrel,
                            body.center().y,
                        );
                        let direction = if body.flip {
                            -config.projectile_speed
                        } else {
                            config.projectile_speed
                        };
                        spawn_projectile(&mut commands, muzzle, direction);
                        let fan = if body.flip { PI } else { 0.0 };
                        for _ in 0..4 {
                            spawn_spark(
                                &mut commands,
                                muzzle,
                                rng.0.gen::<f32>() - 0.5 + fan,
                                2.0 + rng.0.gen::<f32>(),
                            );
                        }
                    }
                }
            }
        } else if rng.0.gen::<f32>() < WALK_CHANCE {
            state.walking = rng.0.gen_range(30..=120);
        }

        step_body(&tilemap, &config, &mut body, movement);

        if movement.x != 0.0 {
            anim.set(EnemyAction::Run, &library);
        } else {
            anim.set(EnemyAction::Idle, &library);
        }
        anim.anim.update();

        // A player inside the dash-impact window smashes enemies on contact.
        // Removal is deferred through Commands; this loop never mutates the
        // enemy list it is iterating.
        if let Some((player_body, player_state)) = player {
            if player_state.dashing.abs() >= config.dash_impact_ticks
                && body.rect().overlaps(&player_body.rect())
            {
                shake.set_at_least(16.0);
                sfx.send(PlaySfx(Sfx::Hit));
                spawn_hit_burst(&mut commands, &library, &mut rng.0, body.center(), true);
                commands.entity(entity).despawn();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TileKind;
    use crate::level::LevelState;
    use bevy::ecs::system::RunSystemOnce;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn enemy_world(map: Tilemap) -> World {
        let mut world = World::new();
        world.insert_resource(GameConfig::default());
        world.insert_resource(map);
        world.insert_resource(AnimationLibrary::default());
        world.insert_resource(SimRng(SmallRng::seed_from_u64(99)));
        world.insert_resource(LevelState::default());
        world.insert_resource(ScreenShake::default());
        world.init_resource::<Events<PlaySfx>>();
        world
    }

    fn spawn_enemy(world: &mut World, pos: Vec2, walking: u32, flip: bool) -> Entity {
        let library = world.resource::<AnimationLibrary>();
        let anim = EnemyAnim::new(library);
        let mut body = Body::new(pos, Vec2::new(8.0, 15.0));
        body.flip = flip;
        world
            .spawn((Enemy, body, EnemyState { walking }, anim))
            .id()
    }

    #[test]
    fn firing_alignment_requires_facing_and_height() {
        assert!(firing_alignment(true, Vec2::new(-40.0, 3.0)));
        assert!(!firing_alignment(true, Vec2::new(40.0, 3.0)));
        assert!(firing_alignment(false, Vec2::new(40.0, -3.0)));
        assert!(!firing_alignment(false, Vec2::new(40.0, 20.0)));
        assert!(!firing_alignment(false, Vec2::new(-40.0, 0.0)));
    }

    #[test]
    fn enemy_turns_at_a_ledge() {
        // Two-tile platform at grid y=2; enemy stands on the right edge
        // facing right, with nothing ahead.
        let mut map = Tilemap::new(16);
        map.insert(TileKind::Stone, 0, (0, 2));
        map.insert(TileKind::Stone, 0, (1, 2));
        let mut world = enemy_world(map);
        spawn_enemy(&mut world, Vec2::new(24.0, 17.0), 10, false);

        world.run_system_once(update_enemies).expect("update");
        let mut query = world.query::<(&Body, &EnemyState)>();
        let (body, state) = query.single(&world);
        assert!(body.flip, "enemy should turn at the ledge");
        assert_eq!(state.walking, 9);
        assert_eq!(body.pos.x, 24.0);
    }

    #[test]
    fn enemy_walks_while_floor_continues() {
        let mut map = Tilemap::new(16);
        for x in 0..6 {
            map.insert(TileKind::Stone, 0, (x, 2));
        }
        let mut world = enemy_world(map);
        spawn_enemy(&mut world, Vec2::new(16.0, 17.0), 10, false);

        world.run_system_once(update_enemies).expect("update");
        let mut query = world.query::<(&Body, &EnemyAnim)>();
        let (body, anim) = query.single(&world);
        assert_eq!(body.pos.x, 16.5);
        assert!(!body.flip);
        assert_eq!(anim.action, EnemyAction::Run);
    }

    #[test]
    fn enemy_shoots_an_aligned_player_when_the_leg_ends() {
        let mut map = Tilemap::new(16);
        for x in -6..6 {
            map.insert(TileKind::Stone, 0, (x, 2));
        }
        let mut world = enemy_world(map);
        spawn_enemy(&mut world, Vec2::new(32.0, 17.0), 1, true);
        {
            let library = world.resource::<AnimationLibrary>();
            let anim = crate::player::PlayerAnim::new(library);
            world.spawn((
                Player,
                Body::new(Vec2::new(-40.0, 17.0), Vec2::new(8.0, 15.0)),
                PlayerState::default(),
                anim,
            ));
        }

        world.run_system_once(update_enemies).expect("update");

        let mut projectiles = world.query::<&crate::projectile::Projectile>();
        let projectile = projectiles.single(&world);
        assert!(projectile.direction < 0.0);
        let mut sparks = world.query::<&crate::spark::Spark>();
        assert_eq!(sparks.iter(&world).count(), 4);
    }

    #[test]
    fn misaligned_player_does_not_draw_fire() {
        let mut map = Tilemap::new(16);
        for x in -6..6 {
            map.insert(TileKind::Stone, 0, (x, 2));
        }
        let mut world = enemy_world(map);
        // Facing left, player far to the right: no shot.
        spawn_enemy(&mut world, Vec2::new(0.0, 17.0), 1, true);
        {
            let library = world.resource::<AnimationLibrary>();
            let anim = crate::player::PlayerAnim::new(library);
            world.spawn((
                Player,
                Body::new(Vec2::new(60.0, 17.0), Vec2::new(8.0, 15.0)),
                PlayerState::default(),
                anim,
            ));
        }

        world.run_system_once(update_enemies).expect("update");
        let mut projectiles = world.query::<&crate::projectile::Projectile>();
        assert_eq!(projectiles.iter(&world).count(), 0);
    }

    #[test]
    fn dashing_player_smashes_enemy_on_contact() {
        let mut world = enemy_world(Tilemap::new(16));
        spawn_enemy(&mut world, Vec2::new(2.0, 0.0), 0, false);
        {
            let library = world.resource::<AnimationLibrary>();
            let anim = crate::player::PlayerAnim::new(library);
            world.spawn((
                Player,
                Body::new(Vec2::ZERO, Vec2::new(8.0, 15.0)),
                PlayerState {
                    dashing: 55,
                    ..Default::default()
                },
                anim,
            ));
        }

        world.run_system_once(update_enemies).expect("update");

        let mut enemies = world.query::<&EnemyState>();
        assert_eq!(enemies.iter(&world).count(), 0);
        assert!(world.resource::<ScreenShake>().0 >= 16.0);
        let mut sparks = world.query::<&crate::spark::Spark>();
        assert_eq!(sparks.iter(&world).count(), 32);
    }
}
