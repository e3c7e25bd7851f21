use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::camera::Scroll;
use crate::components::{GameConfig, GamePos, HeadlessMode, ParticleKind, Player, TileKind};
use crate::enemy::EnemyAnim;
use crate::level::LevelState;
use crate::particles::Particle;
use crate::physics_core::Body;
use crate::player::{PlayerAnim, PlayerState};
use crate::projectile::Projectile;
use crate::spark::Spark;
use crate::sprites::SpriteLibrary;
use crate::tilemap::Tilemap;

/// Game space is y-down with top-left origin; bevy's world is y-up. All
/// simulation state crosses this seam exactly once, here.
pub fn game_to_world(pos: Vec2, z: f32) -> Vec3 {
    Vec3::new(pos.x, -pos.y, z)
}

pub fn rendering_enabled(headless: Res<HeadlessMode>) -> bool {
    !headless.0
}

const Z_OFFGRID: f32 = -5.0;
const Z_TILES: f32 = 0.0;
const Z_ENEMY: f32 = 9.0;
const Z_PLAYER: f32 = 10.0;
const Z_PARTICLES: f32 = 20.0;
const Z_PROJECTILES: f32 = 21.0;
const Z_SPARKS: f32 = 22.0;

#[derive(Component)]
struct TileSprite {
    cell: (i32, i32),
}

#[derive(Component)]
struct OffgridSprite;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                sync_static_tiles,
                ensure_actor_sprites,
                sync_actor_sprites,
                sync_particle_sprites,
                sync_spark_sprites,
                sync_projectile_sprites,
            )
                .chain()
                .run_if(rendering_enabled),
        );
    }
}

fn tile_fallback_color(kind: TileKind) -> Color {
    match kind {
        TileKind::Grass => Color::srgb(0.3, 0.62, 0.25),
        TileKind::Stone => Color::srgb(0.45, 0.45, 0.5),
        TileKind::Decor => Color::srgb(0.3, 0.42, 0.36),
        TileKind::LargeDecor => Color::srgb(0.2, 0.3, 0.24),
        TileKind::Spawners => Color::srgb(0.8, 0.2, 0.8),
    }
}

fn tile_sprite(library: &SpriteLibrary, kind: TileKind, variant: u8, size: f32) -> Sprite {
    if let Some(image) = library.frame(kind.asset_key(), variant as u32) {
        Sprite::from_image(image)
    } else {
        Sprite::from_color(tile_fallback_color(kind), Vec2::splat(size))
    }
}

/// Keep sprites alive for exactly the grid tiles inside the viewport, plus
/// all offgrid decorations. On a level reload everything is rebuilt from the
/// fresh map.
fn sync_static_tiles(
    mut commands: Commands,
    mut last_generation: Local<u64>,
    level: Res<LevelState>,
    config: Res<GameConfig>,
    scroll: Res<Scroll>,
    tilemap: Res<Tilemap>,
    library: Res<SpriteLibrary>,
    tiles: Query<(Entity, &TileSprite)>,
    offgrid: Query<Entity, With<OffgridSprite>>,
) {
    let ts = tilemap.tile_size as f32;
    let reloaded = *last_generation != level.generation;
    if reloaded {
        *last_generation = level.generation;
        for (entity, _) in tiles.iter() {
            commands.entity(entity).despawn();
        }
        for entity in offgrid.iter() {
            commands.entity(entity).despawn();
        }
        for deco in &tilemap.offgrid {
            let center = Vec2::new(deco.pos.0, deco.pos.1) + Vec2::splat(ts / 2.0);
            commands.spawn((
                OffgridSprite,
                tile_sprite(&library, deco.kind, deco.variant, ts),
                Transform::from_translation(game_to_world(center, Z_OFFGRID)),
            ));
        }
    }

    let offset = scroll.render_offset();
    let view = (config.view_width as i32, config.view_height as i32);
    let wanted: HashMap<(i32, i32), (TileKind, u8)> = tilemap
        .tiles_in_view(offset, view)
        .into_iter()
        .map(|tile| (tile.pos, (tile.kind, tile.variant)))
        .collect();

    let mut present = HashSet::new();
    if !reloaded {
        for (entity, tile) in tiles.iter() {
            if wanted.contains_key(&tile.cell) {
                present.insert(tile.cell);
            } else {
                commands.entity(entity).despawn();
            }
        }
    }

    for (cell, (kind, variant)) in wanted {
        if present.contains(&cell) {
            continue;
        }
        let center = Vec2::new(cell.0 as f32 * ts, cell.1 as f32 * ts) + Vec2::splat(ts / 2.0);
        commands.spawn((
            TileSprite { cell },
            tile_sprite(&library, kind, variant, ts),
            Transform::from_translation(game_to_world(center, Z_TILES)),
        ));
    }
}

fn ensure_actor_sprites(
    mut commands: Commands,
    actors: Query<(Entity, &Body, Has<Player>), Without<Sprite>>,
) {
    for (entity, body, is_player) in actors.iter() {
        let (color, z) = if is_player {
            (Color::srgb(0.36, 0.58, 0.89), Z_PLAYER)
        } else {
            (Color::srgb(0.82, 0.32, 0.32), Z_ENEMY)
        };
        commands.entity(entity).insert((
            Sprite::from_color(color, body.size),
            Transform::from_translation(game_to_world(body.center(), z)),
        ));
    }
}

fn sync_actor_sprites(
    config: Res<GameConfig>,
    library: Res<SpriteLibrary>,
    mut actors: Query<(
        &Body,
        Option<&PlayerAnim>,
        Option<&EnemyAnim>,
        Option<&PlayerState>,
        &mut Sprite,
        &mut Transform,
        &mut Visibility,
    )>,
) {
    for (body, player_anim, enemy_anim, player_state, mut sprite, mut transform, mut visibility) in
        actors.iter_mut()
    {
        let z = transform.translation.z;
        transform.translation = game_to_world(body.center(), z);
        sprite.flip_x = body.flip;

        let anim = player_anim
            .map(|a| &a.anim)
            .or_else(|| enemy_anim.map(|a| &a.anim));
        if let Some(anim) = anim {
            if let Some(image) = library.frame(anim.key.asset_key(), anim.current_frame()) {
                sprite.image = image;
                sprite.custom_size = None;
            }
        }

        // The ballistic stretch of a dash draws nothing at all.
        let hidden = player_state
            .map(|state| state.dashing.abs() > config.dash_impact_ticks)
            .unwrap_or(false);
        *visibility = if hidden {
            Visibility::Hidden
        } else {
            Visibility::Inherited
        };
    }
}

fn sync_particle_sprites(
    mut commands: Commands,
    library: Res<SpriteLibrary>,
    mut particles: Query<(
        Entity,
        &GamePos,
        &Particle,
        Option<&mut Sprite>,
        Option<&mut Transform>,
    )>,
) {
    for (entity, pos, particle, sprite, transform) in particles.iter_mut() {
        let translation = game_to_world(pos.0, Z_PARTICLES);
        match (sprite, transform) {
            (Some(mut sprite), Some(mut transform)) => {
                transform.translation = translation;
                if let Some(image) =
                    library.frame(particle.anim.key.asset_key(), particle.anim.current_frame())
                {
                    sprite.image = image;
                    sprite.custom_size = None;
                }
            }
            _ => {
                let (color, size) = match particle.kind {
                    ParticleKind::Leaf => (Color::srgb(0.42, 0.55, 0.33), Vec2::splat(4.0)),
                    ParticleKind::Dust => (Color::srgb(0.92, 0.9, 0.85), Vec2::splat(2.0)),
                };
                commands.entity(entity).insert((
                    Sprite::from_color(color, size),
                    Transform::from_translation(translation),
                ));
            }
        }
    }
}

/// Sparks draw as a thin rotated quad standing in for the diamond polygon:
/// long along the travel direction, sliver-thin across it.
fn sync_spark_sprites(
    mut commands: Commands,
    mut sparks: Query<(
        Entity,
        &GamePos,
        &Spark,
        Option<&mut Sprite>,
        Option<&mut Transform>,
    )>,
) {
    for (entity, pos, spark, sprite, transform) in sparks.iter_mut() {
        let translation = game_to_world(pos.0, Z_SPARKS);
        let rotation = Quat::from_rotation_z(-spark.angle);
        let size = Vec2::new((spark.speed * 6.0).max(0.5), spark.speed.max(0.5));
        match (sprite, transform) {
            (Some(mut sprite), Some(mut transform)) => {
                transform.translation = translation;
                transform.rotation = rotation;
                sprite.custom_size = Some(size);
            }
            _ => {
                commands.entity(entity).insert((
                    Sprite::from_color(Color::WHITE, size),
                    Transform {
                        translation,
                        rotation,
                        ..default()
                    },
                ));
            }
        }
    }
}

fn sync_projectile_sprites(
    mut commands: Commands,
    library: Res<SpriteLibrary>,
    mut projectiles: Query<
        (
            Entity,
            &GamePos,
            Option<&mut Sprite>,
            Option<&mut Transform>,
        ),
        With<Projectile>,
    >,
) {
    for (entity, pos, sprite, transform) in projectiles.iter_mut() {
        let translation = game_to_world(pos.0, Z_PROJECTILES);
        match (sprite, transform) {
            (Some(mut sprite), Some(mut transform)) => {
                transform.translation = translation;
                if let Some(image) = library.frame("projectile", 0) {
                    sprite.image = image;
                    sprite.custom_size = None;
                }
            }
            _ => {
                commands.entity(entity).insert((
                    Sprite::from_color(Color::srgb(0.95, 0.85, 0.6), Vec2::new(4.0, 2.0)),
                    Transform::from_translation(translation),
                ));
            }
        }
    }
}
