use std::collections::HashSet;

use bevy::prelude::*;

/// Abstraction layer between raw key events and the simulation. Keyboard
/// input (windowed) and test setups both write into this.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    Left,
    Right,
    Jump,
    Dash,
    Pause,
}

#[derive(Resource, Default, Clone)]
pub struct VirtualInput {
    pub active: HashSet<Action>,
    pub just_pressed: HashSet<Action>,
}

impl VirtualInput {
    pub fn pressed(&self, action: Action) -> bool {
        self.active.contains(&action)
    }

    pub fn just_pressed(&self, action: Action) -> bool {
        self.just_pressed.contains(&action)
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(VirtualInput::default()).add_systems(
            PreUpdate,
            keyboard_to_virtual.run_if(resource_exists::<ButtonInput<KeyCode>>),
        );
    }
}

const BINDINGS: [(Action, &[KeyCode]); 5] = [
    (Action::Left, &[KeyCode::ArrowLeft, KeyCode::KeyA]),
    (Action::Right, &[KeyCode::ArrowRight, KeyCode::KeyD]),
    (Action::Jump, &[KeyCode::ArrowUp, KeyCode::Space]),
    (Action::Dash, &[KeyCode::KeyX]),
    (Action::Pause, &[KeyCode::Escape]),
];

fn keyboard_to_virtual(keyboard: Res<ButtonInput<KeyCode>>, mut vinput: ResMut<VirtualInput>) {
    vinput.active.clear();
    vinput.just_pressed.clear();
    for (action, keys) in BINDINGS {
        if keys.iter().any(|k| keyboard.pressed(*k)) {
            vinput.active.insert(action);
        }
        if keys.iter().any(|k| keyboard.just_pressed(*k)) {
            vinput.just_pressed.insert(action);
        }
    }
}
