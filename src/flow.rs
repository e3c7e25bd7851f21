use bevy::prelude::*;

use crate::components::HeadlessMode;
use crate::input::{Action, VirtualInput};

/// Coarse app flow. The simulation only advances in `Playing`; `Menu` is the
/// pre-game title screen, `Paused` freezes everything in place.
#[derive(States, Default, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum GameFlow {
    #[default]
    Menu,
    Playing,
    Paused,
}

#[derive(Component)]
struct FlowOverlayText;

pub struct FlowPlugin;

impl Plugin for FlowPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                start_from_menu.run_if(in_state(GameFlow::Menu)),
                pause.run_if(in_state(GameFlow::Playing)),
                resume.run_if(in_state(GameFlow::Paused)),
            ),
        )
        .add_systems(OnEnter(GameFlow::Menu), show_menu_overlay)
        .add_systems(OnExit(GameFlow::Menu), clear_overlay)
        .add_systems(OnEnter(GameFlow::Paused), show_pause_overlay)
        .add_systems(OnExit(GameFlow::Paused), clear_overlay);
    }
}

fn start_from_menu(input: Res<VirtualInput>, mut next: ResMut<NextState<GameFlow>>) {
    if input.just_pressed(Action::Jump) {
        next.set(GameFlow::Playing);
    }
}

fn pause(input: Res<VirtualInput>, mut next: ResMut<NextState<GameFlow>>) {
    if input.just_pressed(Action::Pause) {
        next.set(GameFlow::Paused);
    }
}

fn resume(input: Res<VirtualInput>, mut next: ResMut<NextState<GameFlow>>) {
    if input.just_pressed(Action::Pause) || input.just_pressed(Action::Jump) {
        next.set(GameFlow::Playing);
    }
}

fn show_menu_overlay(commands: Commands, headless: Res<HeadlessMode>) {
    spawn_overlay(commands, &headless, "EMBER\npress jump to start");
}

fn show_pause_overlay(commands: Commands, headless: Res<HeadlessMode>) {
    spawn_overlay(commands, &headless, "paused");
}

fn spawn_overlay(mut commands: Commands, headless: &HeadlessMode, message: &str) {
    if headless.0 {
        return;
    }
    commands.spawn((
        FlowOverlayText,
        Text::new(message),
        TextFont {
            font_size: 28.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Percent(38.0),
            top: Val::Percent(42.0),
            ..default()
        },
    ));
}

fn clear_overlay(mut commands: Commands, overlay: Query<Entity, With<FlowOverlayText>>) {
    for entity in overlay.iter() {
        commands.entity(entity).despawn();
    }
}
