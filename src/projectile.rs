use bevy::prelude::*;
use rand::Rng;

use crate::animation::AnimationLibrary;
use crate::audio::{PlaySfx, Sfx};
use crate::camera::ScreenShake;
use crate::components::{Enemy, GameConfig, GamePos, Player, SimRng};
use crate::level::LevelState;
use crate::particles::spawn_hit_burst;
use crate::physics_core::Body;
use crate::player::PlayerState;
use crate::spark::spawn_spark;
use crate::tilemap::Tilemap;

/// An enemy bullet: a point moving horizontally at fixed speed. Dies against
/// solid tiles, against the player (outside the dash-impact window), or of
/// old age.
#[derive(Component, Clone, Debug)]
pub struct Projectile {
    /// Signed horizontal speed in pixels per tick.
    pub direction: f32,
    pub age: u32,
}

pub fn spawn_projectile(commands: &mut Commands, pos: Vec2, direction: f32) {
    commands.spawn((Projectile { direction, age: 0 }, GamePos(pos)));
}

pub fn update_projectiles(
    mut commands: Commands,
    config: Res<GameConfig>,
    tilemap: Res<Tilemap>,
    library: Res<AnimationLibrary>,
    mut rng: ResMut<SimRng>,
    mut level: ResMut<LevelState>,
    mut shake: ResMut<ScreenShake>,
    mut sfx: EventWriter<PlaySfx>,
    mut projectiles: Query<(Entity, &mut Projectile, &mut GamePos)>,
    player: Query<(&Body, &PlayerState), (With<Player>, Without<Enemy>)>,
) {
    use std::f32::consts::PI;
    let player = player.get_single().ok();

    for (entity, mut projectile, mut pos) in projectiles.iter_mut() {
        pos.0.x += projectile.direction;
        projectile.age += 1;

        if tilemap.solid_check((pos.0.x, pos.0.y)) {
            // Sparks bounce back against the direction of travel.
            let base = if projectile.direction > 0.0 { PI } else { 0.0 };
            for _ in 0..4 {
                spawn_spark(
                    &mut commands,
                    pos.0,
                    rng.0.gen::<f32>() - 0.5 + base,
                    2.0 + rng.0.gen::<f32>(),
                );
            }
            commands.entity(entity).despawn();
            continue;
        }
        if projectile.age > config.projectile_max_age {
            commands.entity(entity).despawn();
            continue;
        }

        if let Some((body, state)) = player {
            let vulnerable = state.dashing.abs() < config.dash_impact_ticks;
            if vulnerable && level.dead == 0 && body.rect().contains_point(pos.0) {
                commands.entity(entity).despawn();
                level.dead += 1;
                shake.set_at_least(16.0);
                sfx.send(PlaySfx(Sfx::Hit));
                spawn_hit_burst(&mut commands, &library, &mut rng.0, body.center(), false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TileKind;
    use bevy::ecs::system::RunSystemOnce;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn projectile_world(map: Tilemap) -> World {
        let mut world = World::new();
        world.insert_resource(GameConfig::default());
        world.insert_resource(map);
        world.insert_resource(AnimationLibrary::default());
        world.insert_resource(SimRng(SmallRng::seed_from_u64(11)));
        world.insert_resource(LevelState::default());
        world.insert_resource(ScreenShake::default());
        world.init_resource::<Events<PlaySfx>>();
        world
    }

    #[test]
    fn projectile_shatters_on_solid_tile() {
        let mut map = Tilemap::new(16);
        map.insert(TileKind::Stone, 0, (1, 0));
        let mut world = projectile_world(map);
        world.spawn((
            Projectile {
                direction: 1.5,
                age: 0,
            },
            GamePos(Vec2::new(15.0, 8.0)),
        ));

        world
            .run_system_once(update_projectiles)
            .expect("update projectiles");

        let mut projectiles = world.query::<&Projectile>();
        assert_eq!(projectiles.iter(&world).count(), 0);
        let mut sparks = world.query::<&crate::spark::Spark>();
        assert_eq!(sparks.iter(&world).count(), 4);
    }

    #[test]
    fn projectile_expires_at_max_age() {
        let mut world = projectile_world(Tilemap::new(16));
        world.spawn((
            Projectile {
                direction: 1.5,
                age: 360,
            },
            GamePos(Vec2::ZERO),
        ));

        world
            .run_system_once(update_projectiles)
            .expect("update projectiles");

        let mut projectiles = world.query::<&Projectile>();
        assert_eq!(projectiles.iter(&world).count(), 0);
    }

    #[test]
    fn projectile_kills_a_grounded_player_but_not_a_dashing_one() {
        let mut world = projectile_world(Tilemap::new(16));
        world.spawn((
            Player,
            Body::new(Vec2::new(10.0, 0.0), Vec2::new(8.0, 15.0)),
            PlayerState {
                dashing: 55,
                ..Default::default()
            },
        ));
        world.spawn((
            Projectile {
                direction: 1.5,
                age: 0,
            },
            GamePos(Vec2::new(10.0, 8.0)),
        ));

        world
            .run_system_once(update_projectiles)
            .expect("update projectiles");
        assert_eq!(world.resource::<LevelState>().dead, 0);
        {
            let mut projectiles = world.query::<&Projectile>();
            assert_eq!(projectiles.iter(&world).count(), 1);
        }

        {
            let mut players = world.query::<&mut PlayerState>();
            players.single_mut(&mut world).dashing = 0;
        }
        world
            .run_system_once(update_projectiles)
            .expect("update projectiles");
        assert_eq!(world.resource::<LevelState>().dead, 1);
        assert!(world.resource::<ScreenShake>().0 >= 16.0);
        let mut projectiles = world.query::<&Projectile>();
        assert_eq!(projectiles.iter(&world).count(), 0);
    }
}
