use bevy::prelude::*;

use crate::components::GamePos;

const SPEED_DECAY: f32 = 0.1;

/// A short streak of light launched along a fixed angle. Self-terminating:
/// once the speed decays to zero the entity despawns.
#[derive(Component, Clone, Debug)]
pub struct Spark {
    pub angle: f32,
    pub speed: f32,
}

pub fn spawn_spark(commands: &mut Commands, pos: Vec2, angle: f32, speed: f32) {
    commands.spawn((Spark { angle, speed }, GamePos(pos)));
}

pub fn update_sparks(
    mut commands: Commands,
    mut sparks: Query<(Entity, &mut Spark, &mut GamePos)>,
) {
    for (entity, mut spark, mut pos) in sparks.iter_mut() {
        let step = Vec2::new(spark.angle.cos(), spark.angle.sin()) * spark.speed;
        pos.0 += step;
        spark.speed = (spark.speed - SPEED_DECAY).max(0.0);
        if spark.speed <= 0.0 {
            commands.entity(entity).despawn();
        }
    }
}

/// Vertices of the thin diamond a spark renders as: elongated along the
/// travel direction, narrow across it, both proportional to current speed.
pub fn diamond_points(pos: Vec2, angle: f32, speed: f32) -> [Vec2; 4] {
    use std::f32::consts::PI;
    let at = |a: f32, r: f32| pos + Vec2::new(a.cos(), a.sin()) * r;
    [
        at(angle, speed * 3.0),
        at(angle + PI * 0.5, speed * 0.5),
        at(angle + PI, speed * 3.0),
        at(angle - PI * 0.5, speed * 0.5),
    ]
}
