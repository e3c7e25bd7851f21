use bevy::prelude::*;
use rand::Rng;

use crate::camera::Scroll;
use crate::components::{GameConfig, HeadlessMode, SimRng};
use crate::render::game_to_world;
use crate::sprites::SpriteLibrary;

const CLOUD_COUNT: usize = 16;
/// Nominal cloud footprint used for wrap-around (the fallback rect size).
const CLOUD_SIZE: Vec2 = Vec2::new(48.0, 20.0);

/// A background cloud drifting slowly rightward. Depth scales both parallax
/// and stacking, so far clouds crawl and near clouds slide.
#[derive(Component, Clone, Debug)]
pub struct Cloud {
    pub pos: Vec2,
    pub speed: f32,
    pub depth: f32,
    pub variant: usize,
}

pub struct CloudsPlugin;

impl Plugin for CloudsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_clouds)
            .add_systems(Update, sync_cloud_sprites.run_if(crate::render::rendering_enabled));
    }
}

fn spawn_clouds(mut commands: Commands, headless: Res<HeadlessMode>, mut rng: ResMut<SimRng>) {
    if headless.0 {
        return;
    }
    for _ in 0..CLOUD_COUNT {
        let depth = rng.0.gen::<f32>() * 0.6 + 0.2;
        commands.spawn((
            Cloud {
                pos: Vec2::new(
                    rng.0.gen::<f32>() * 99999.0,
                    rng.0.gen::<f32>() * 99999.0,
                ),
                speed: rng.0.gen::<f32>() * 0.05 + 0.05,
                depth,
                variant: rng.0.gen_range(0..2),
            },
            Sprite::from_color(Color::srgba(0.88, 0.91, 0.95, 0.7), CLOUD_SIZE),
            Transform::from_xyz(0.0, 0.0, -60.0 + depth * 10.0),
        ));
    }
}

pub fn drift_clouds(mut clouds: Query<&mut Cloud>) {
    for mut cloud in clouds.iter_mut() {
        let dx = cloud.speed;
        cloud.pos.x += dx;
    }
}

/// Project each cloud into the view with depth-scaled parallax, wrapping it
/// around the screen so the field never runs out.
fn sync_cloud_sprites(
    config: Res<GameConfig>,
    scroll: Res<Scroll>,
    library: Res<SpriteLibrary>,
    mut clouds: Query<(&Cloud, &mut Sprite, &mut Transform)>,
) {
    let offset = scroll.render_offset();
    let view = config.view_size();
    for (cloud, mut sprite, mut transform) in clouds.iter_mut() {
        let parallax = Vec2::new(
            cloud.pos.x - offset.0 as f32 * cloud.depth,
            cloud.pos.y - offset.1 as f32 * cloud.depth,
        );
        let screen = Vec2::new(
            parallax.x.rem_euclid(view.x + CLOUD_SIZE.x) - CLOUD_SIZE.x,
            parallax.y.rem_euclid(view.y + CLOUD_SIZE.y) - CLOUD_SIZE.y,
        );
        let game = Vec2::new(offset.0 as f32, offset.1 as f32) + screen + CLOUD_SIZE / 2.0;
        let z = transform.translation.z;
        transform.translation = game_to_world(game, z);
        if let Some(image) = library.frame("clouds", cloud.variant as u32) {
            sprite.image = image;
            sprite.custom_size = None;
        }
    }
}
