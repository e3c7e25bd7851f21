use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Marks the player entity
#[derive(Component)]
pub struct Player;

/// Marks enemy entities
#[derive(Component)]
pub struct Enemy;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Grass,
    Stone,
    Decor,
    LargeDecor,
    Spawners,
}

impl TileKind {
    /// Kinds that participate in collision. Decorations and spawn markers
    /// are walk-through.
    pub fn is_solid(self) -> bool {
        matches!(self, TileKind::Grass | TileKind::Stone)
    }

    pub fn is_autotile(self) -> bool {
        matches!(self, TileKind::Grass | TileKind::Stone)
    }

    pub fn asset_key(self) -> &'static str {
        match self {
            TileKind::Grass => "tiles/grass",
            TileKind::Stone => "tiles/stone",
            TileKind::Decor => "tiles/decor",
            TileKind::LargeDecor => "tiles/large_decor",
            TileKind::Spawners => "tiles/spawners",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PlayerAction {
    Idle,
    Run,
    Jump,
    Slide,
    WallSlide,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EnemyAction {
    Idle,
    Run,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ParticleKind {
    Leaf,
    Dust,
}

/// Axis-aligned rectangle in game space: y grows downward, `(x, y)` is the
/// top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn set_left(&mut self, left: f32) {
        self.x = left;
    }

    pub fn set_right(&mut self, right: f32) {
        self.x = right - self.w;
    }

    pub fn set_top(&mut self, top: f32) {
        self.y = top;
    }

    pub fn set_bottom(&mut self, bottom: f32) {
        self.y = bottom - self.h;
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }
}

/// Which sides of an entity touched a solid tile during the last physics step.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Collisions {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Position in game space (pixels, y-down) for transient effect entities that
/// don't carry a full physics body.
#[derive(Component, Clone, Copy, Debug)]
pub struct GamePos(pub Vec2);

/// Whether the app runs without a window (no sprites, no audio playback).
#[derive(Resource, Clone, Copy)]
pub struct HeadlessMode(pub bool);

/// Shared random stream for gameplay decisions. Seedable so AI behavior can be
/// pinned down in tests.
#[derive(Resource)]
pub struct SimRng(pub SmallRng);

impl Default for SimRng {
    fn default() -> Self {
        Self(SmallRng::from_entropy())
    }
}

/// Tuning constants, all in per-tick units (the simulation is locked to 60
/// ticks per second).
#[derive(Resource, Clone, serde::Serialize, serde::Deserialize)]
pub struct GameConfig {
    pub gravity: f32,
    pub terminal_velocity: f32,
    pub friction: f32,
    pub jump_velocity: f32,
    pub wall_jump_kick: (f32, f32),
    pub wall_slide_cap: f32,
    pub max_jumps: u32,
    pub max_air_time: u32,
    pub dash_ticks: i32,
    pub dash_impact_ticks: i32,
    pub dash_speed: f32,
    pub enemy_speed: f32,
    pub projectile_speed: f32,
    pub projectile_max_age: u32,
    pub view_width: f32,
    pub view_height: f32,
}

impl GameConfig {
    pub fn view_size(&self) -> Vec2 {
        Vec2::new(self.view_width, self.view_height)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            gravity: 0.1,
            terminal_velocity: 5.0,
            friction: 0.1,
            jump_velocity: 3.0,
            wall_jump_kick: (3.5, 2.5),
            wall_slide_cap: 0.5,
            max_jumps: 1,
            max_air_time: 120,
            dash_ticks: 60,
            dash_impact_ticks: 50,
            dash_speed: 8.0,
            enemy_speed: 0.5,
            projectile_speed: 1.5,
            projectile_max_age: 360,
            view_width: 320.0,
            view_height: 240.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_edges_follow_y_down_convention() {
        let r = Rect::new(10.0, 20.0, 8.0, 15.0);
        assert_eq!(r.top(), 20.0);
        assert_eq!(r.bottom(), 35.0);
        assert_eq!(r.right(), 18.0);
        assert_eq!(r.center(), Vec2::new(14.0, 27.5));
    }

    #[test]
    fn rect_edge_setters_move_the_rect() {
        let mut r = Rect::new(0.0, 0.0, 8.0, 15.0);
        r.set_bottom(16.0);
        assert_eq!(r.y, 1.0);
        r.set_right(16.0);
        assert_eq!(r.x, 8.0);
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 16.0, 16.0);
        let b = Rect::new(16.0, 0.0, 16.0, 16.0);
        assert!(!a.overlaps(&b));
        let c = Rect::new(15.0, 0.0, 16.0, 16.0);
        assert!(a.overlaps(&c));
    }

    #[test]
    fn tile_kind_solidity() {
        assert!(TileKind::Grass.is_solid());
        assert!(TileKind::Stone.is_solid());
        assert!(!TileKind::Decor.is_solid());
        assert!(!TileKind::LargeDecor.is_solid());
        assert!(!TileKind::Spawners.is_solid());
    }
}
