use bevy::prelude::*;
use rand::Rng;

use crate::animation::{Animation, AnimKey, AnimationLibrary};
use crate::components::{GamePos, ParticleKind, Rect, SimRng};
use crate::spark::spawn_spark;

/// Leaf particles drift sideways on a slow sine wave, purely cosmetic.
const LEAF_SWAY_RATE: f32 = 0.035;
const LEAF_SWAY_AMPLITUDE: f32 = 0.3;

/// A transient visual effect driven by its animation: when the (non-looping)
/// cycle completes, the particle removes itself.
#[derive(Component, Clone, Debug)]
pub struct Particle {
    pub kind: ParticleKind,
    pub velocity: Vec2,
    pub anim: Animation,
}

/// Pixel rects that shed leaf particles, extracted from the map's large
/// decorations at level load.
#[derive(Resource, Default)]
pub struct LeafSpawners(pub Vec<Rect>);

pub fn spawn_particle(
    commands: &mut Commands,
    library: &AnimationLibrary,
    kind: ParticleKind,
    pos: Vec2,
    velocity: Vec2,
    start_frame: u32,
) {
    let anim = library
        .instantiate(AnimKey::Particle(kind))
        .with_start_frame(start_frame);
    commands.spawn((
        Particle {
            kind,
            velocity,
            anim,
        },
        GamePos(pos),
    ));
}

/// The burst thrown off when something gets smashed: thirty sparks plus dust
/// flung back along each spark's angle. `axial` adds the two heavy horizontal
/// sparks of a dash kill.
pub fn spawn_hit_burst(
    commands: &mut Commands,
    library: &AnimationLibrary,
    rng: &mut impl Rng,
    center: Vec2,
    axial: bool,
) {
    use std::f32::consts::{PI, TAU};
    for _ in 0..30 {
        let angle = rng.gen::<f32>() * TAU;
        let speed = rng.gen::<f32>() * 5.0;
        spawn_spark(commands, center, angle, 2.0 + rng.gen::<f32>());
        spawn_particle(
            commands,
            library,
            ParticleKind::Dust,
            center,
            Vec2::new((angle + PI).cos(), (angle + PI).sin()) * speed * 0.5,
            rng.gen_range(0..8),
        );
    }
    if axial {
        spawn_spark(commands, center, 0.0, 5.0 + rng.gen::<f32>());
        spawn_spark(commands, center, PI, 5.0 + rng.gen::<f32>());
    }
}

/// Slow-chance leaf emission from every spawner zone; chance scales with the
/// zone's area so bigger canopies shed more.
pub fn spawn_leaf_particles(
    mut commands: Commands,
    spawners: Res<LeafSpawners>,
    library: Res<AnimationLibrary>,
    mut rng: ResMut<SimRng>,
) {
    for rect in &spawners.0 {
        if rng.0.gen::<f32>() * 49999.0 < rect.w * rect.h {
            let pos = Vec2::new(
                rect.x + rng.0.gen::<f32>() * rect.w,
                rect.y + rng.0.gen::<f32>() * rect.h,
            );
            spawn_particle(
                &mut commands,
                &library,
                ParticleKind::Leaf,
                pos,
                Vec2::new(-0.1, 0.3),
                rng.0.gen_range(0..=20),
            );
        }
    }
}

pub fn update_particles(
    mut commands: Commands,
    mut particles: Query<(Entity, &mut Particle, &mut GamePos)>,
) {
    for (entity, mut particle, mut pos) in particles.iter_mut() {
        let velocity = particle.velocity;
        pos.0 += velocity;
        particle.anim.update();
        if particle.kind == ParticleKind::Leaf {
            pos.0.x += (particle.anim.cursor() as f32 * LEAF_SWAY_RATE).sin() * LEAF_SWAY_AMPLITUDE;
        }
        if particle.anim.done() {
            commands.entity(entity).despawn();
        }
    }
}
