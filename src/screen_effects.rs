use bevy::prelude::*;

use crate::camera::MainCamera;
use crate::components::HeadlessMode;
use crate::level::LevelState;

/// Outer edge of the wipe annulus; generously past the view diagonal so the
/// black ring always covers the whole screen.
const WIPE_OUTER_RADIUS: f32 = 400.0;

/// Radius of the visible circle during a wipe. The transition counter runs
/// -30..=30; the circle is fully open at 0 and fully closed at either end.
pub fn wipe_radius(transition: i32) -> f32 {
    ((30 - transition.abs()) * 8) as f32
}

/// Marker for the fullscreen wipe overlay (a black annulus whose hole is the
/// visible circle).
#[derive(Component)]
struct WipeOverlay;

pub struct ScreenEffectsPlugin;

impl Plugin for ScreenEffectsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_wipe_overlay)
            .add_systems(Update, sync_wipe_overlay);
    }
}

fn spawn_wipe_overlay(
    mut commands: Commands,
    headless: Res<HeadlessMode>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<ColorMaterial>>>,
) {
    if headless.0 {
        return;
    }
    let (Some(mut meshes), Some(mut materials)) = (meshes, materials) else {
        return;
    };
    commands.spawn((
        WipeOverlay,
        Mesh2d(meshes.add(Annulus::new(wipe_radius(0), WIPE_OUTER_RADIUS))),
        MeshMaterial2d(materials.add(Color::BLACK)),
        Transform::from_xyz(0.0, 0.0, 300.0),
        Visibility::Hidden,
    ));
}

fn sync_wipe_overlay(
    level: Res<LevelState>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    camera: Query<&Transform, (With<MainCamera>, Without<WipeOverlay>)>,
    mut overlay: Query<(&mut Transform, &mut Visibility, &Mesh2d), With<WipeOverlay>>,
) {
    let Some(mut meshes) = meshes else {
        return;
    };
    let Ok((mut transform, mut visibility, mesh2d)) = overlay.get_single_mut() else {
        return;
    };
    if let Ok(cam) = camera.get_single() {
        transform.translation.x = cam.translation.x;
        transform.translation.y = cam.translation.y;
    }
    if level.transition == 0 {
        *visibility = Visibility::Hidden;
        return;
    }
    *visibility = Visibility::Inherited;
    // Rebuild the annulus in place each frame the wipe is active; the handle
    // stays stable so nothing leaks into the mesh store.
    if let Some(mesh) = meshes.get_mut(&mesh2d.0) {
        *mesh = Annulus::new(wipe_radius(level.transition), WIPE_OUTER_RADIUS).into();
    }
}
