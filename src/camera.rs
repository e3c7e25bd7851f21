use bevy::prelude::*;
use bevy::render::camera::ScalingMode;

use crate::components::{GameConfig, HeadlessMode, Player};
use crate::physics_core::Body;

/// How much of the remaining distance to the target the camera covers per
/// tick (an exponential ease toward the player).
const FOLLOW_DIVISOR: f32 = 30.0;

#[derive(Component)]
pub struct MainCamera;

/// Game-space camera scroll: the top-left corner of the view. The render
/// offset truncates to whole pixels so tiles land on pixel boundaries.
#[derive(Resource, Default, Clone, Copy)]
pub struct Scroll {
    pub pos: Vec2,
}

impl Scroll {
    pub fn render_offset(&self) -> (i32, i32) {
        (self.pos.x as i32, self.pos.y as i32)
    }
}

/// Decaying random jitter applied on top of the scroll. Impacts raise it to
/// at least 16; it loses one pixel of amplitude per tick.
#[derive(Resource, Default, Clone, Copy)]
pub struct ScreenShake(pub f32);

impl ScreenShake {
    pub fn set_at_least(&mut self, amplitude: f32) {
        self.0 = self.0.max(amplitude);
    }
}

/// One smoothing step of the scroll toward centering `target` in the view.
pub fn follow_step(scroll: Vec2, target: Vec2, view: Vec2) -> Vec2 {
    scroll + (target - view / 2.0 - scroll) / FOLLOW_DIVISOR
}

pub fn update_scroll(
    config: Res<GameConfig>,
    mut scroll: ResMut<Scroll>,
    player: Query<&Body, With<Player>>,
) {
    let Ok(body) = player.get_single() else {
        return;
    };
    scroll.pos = follow_step(scroll.pos, body.center(), config.view_size());
}

pub fn decay_shake(mut shake: ResMut<ScreenShake>) {
    shake.0 = (shake.0 - 1.0).max(0.0);
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Scroll::default())
            .insert_resource(ScreenShake::default())
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, sync_camera_transform);
    }
}

fn spawn_camera(mut commands: Commands, config: Res<GameConfig>, headless: Res<HeadlessMode>) {
    if headless.0 {
        return;
    }
    commands.spawn((
        MainCamera,
        Camera2d,
        OrthographicProjection {
            scaling_mode: ScalingMode::AutoMin {
                min_width: config.view_width,
                min_height: config.view_height,
            },
            ..OrthographicProjection::default_2d()
        },
        Transform::from_xyz(0.0, 0.0, 100.0),
    ));
}

/// Map the game-space scroll (plus shake jitter) onto the bevy camera.
/// Runs per render frame; the jitter is cosmetic and unseeded.
fn sync_camera_transform(
    config: Res<GameConfig>,
    scroll: Res<Scroll>,
    shake: Res<ScreenShake>,
    mut camera: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(mut transform) = camera.get_single_mut() else {
        return;
    };
    let jitter = Vec2::new(
        rand::random::<f32>() * shake.0 - shake.0 / 2.0,
        rand::random::<f32>() * shake.0 - shake.0 / 2.0,
    );
    let offset = scroll.render_offset();
    let center = Vec2::new(
        offset.0 as f32 + config.view_width / 2.0 + jitter.x,
        offset.1 as f32 + config.view_height / 2.0 + jitter.y,
    );
    transform.translation.x = center.x;
    transform.translation.y = -center.y;
}
