use bevy::prelude::*;

use crate::components::{Collisions, GameConfig, Rect};
use crate::tilemap::Tilemap;

/// Common physics state shared by every moving character. Player and enemy
/// behavior are layered around `step_body` rather than specializing it.
#[derive(Component, Clone, Debug)]
pub struct Body {
    /// Top-left corner of the collision rect, game space (y-down pixels).
    pub pos: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    pub collisions: Collisions,
    pub flip: bool,
    pub last_movement: Vec2,
}

impl Body {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            pos,
            size,
            velocity: Vec2::ZERO,
            collisions: Collisions::default(),
            flip: false,
            last_movement: Vec2::ZERO,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }
}

/// Advance a body by one tick: desired movement plus carried velocity, swept
/// one axis at a time against the solid tiles near the body.
///
/// Each axis applies the full displacement, then clamps against every
/// overlapping rect in `physics_rects_around` enumeration order; when several
/// tiles overlap at once the last one wins the position write. Grid-aligned,
/// non-overlapping solids keep that ambiguity unobservable in practice.
pub fn step_body(tilemap: &Tilemap, config: &GameConfig, body: &mut Body, movement: Vec2) {
    body.collisions = Collisions::default();
    let frame_movement = movement + body.velocity;

    body.pos.x += frame_movement.x;
    let mut rect = body.rect();
    for tile_rect in tilemap.physics_rects_around((body.pos.x, body.pos.y)) {
        if rect.overlaps(&tile_rect) {
            if frame_movement.x > 0.0 {
                body.collisions.right = true;
                rect.set_right(tile_rect.left());
            }
            if frame_movement.x < 0.0 {
                body.collisions.left = true;
                rect.set_left(tile_rect.right());
            }
            body.pos.x = rect.x;
        }
    }

    body.pos.y += frame_movement.y;
    let mut rect = body.rect();
    for tile_rect in tilemap.physics_rects_around((body.pos.x, body.pos.y)) {
        if rect.overlaps(&tile_rect) {
            if frame_movement.y > 0.0 {
                body.collisions.down = true;
                rect.set_bottom(tile_rect.top());
            }
            if frame_movement.y < 0.0 {
                body.collisions.up = true;
                rect.set_top(tile_rect.bottom());
            }
            body.pos.y = rect.y;
        }
    }

    // Zero movement leaves facing unchanged.
    if movement.x > 0.0 {
        body.flip = false;
    }
    if movement.x < 0.0 {
        body.flip = true;
    }
    body.last_movement = movement;

    body.velocity.y = (body.velocity.y + config.gravity).min(config.terminal_velocity);
    if body.collisions.down || body.collisions.up {
        body.velocity.y = 0.0;
    }
}
