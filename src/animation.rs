use std::collections::HashMap;

use bevy::prelude::*;

use crate::components::{EnemyAction, ParticleKind, PlayerAction};

/// Identity of a frame sequence in the asset namespace. Actions map to
/// animations through this key instead of string concatenation at runtime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AnimKey {
    Player(PlayerAction),
    Enemy(EnemyAction),
    Particle(ParticleKind),
}

impl AnimKey {
    pub fn asset_key(self) -> &'static str {
        match self {
            AnimKey::Player(PlayerAction::Idle) => "entities/player/idle",
            AnimKey::Player(PlayerAction::Run) => "entities/player/run",
            AnimKey::Player(PlayerAction::Jump) => "entities/player/jump",
            AnimKey::Player(PlayerAction::Slide) => "entities/player/slide",
            AnimKey::Player(PlayerAction::WallSlide) => "entities/player/wall_slide",
            AnimKey::Enemy(EnemyAction::Idle) => "entities/enemy/idle",
            AnimKey::Enemy(EnemyAction::Run) => "entities/enemy/run",
            AnimKey::Particle(ParticleKind::Leaf) => "particles/leaf",
            AnimKey::Particle(ParticleKind::Dust) => "particles/particle",
        }
    }
}

/// Immutable description of a frame sequence. Shared through the library;
/// holders never advance a template, only their own `Animation`.
#[derive(Clone, Copy, Debug)]
pub struct AnimationTemplate {
    pub frame_count: u32,
    /// Ticks each image stays on screen.
    pub frame_duration: u32,
    pub looping: bool,
}

/// A per-holder cursor over a template. Constructed by copying the template's
/// parameters, so two holders of the same sequence never share state.
#[derive(Clone, Debug)]
pub struct Animation {
    pub key: AnimKey,
    frame_count: u32,
    frame_duration: u32,
    looping: bool,
    frame: u32,
    done: bool,
}

impl Animation {
    pub fn from_template(key: AnimKey, template: AnimationTemplate) -> Self {
        Self {
            key,
            frame_count: template.frame_count.max(1),
            frame_duration: template.frame_duration.max(1),
            looping: template.looping,
            frame: 0,
            done: false,
        }
    }

    /// Start partway through, e.g. to desynchronize leaf particles.
    pub fn with_start_frame(mut self, frame: u32) -> Self {
        self.frame = frame.min(self.total_ticks() - 1);
        self
    }

    fn total_ticks(&self) -> u32 {
        self.frame_count * self.frame_duration
    }

    /// Advance one tick. Looping cursors wrap; non-looping cursors freeze on
    /// the last tick and raise `done`.
    pub fn update(&mut self) {
        let total = self.total_ticks();
        if self.looping {
            self.frame = (self.frame + 1) % total;
        } else {
            self.frame = (self.frame + 1).min(total - 1);
            if self.frame >= total - 1 {
                self.done = true;
            }
        }
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn cursor(&self) -> u32 {
        self.frame
    }

    /// Index of the image to draw this tick.
    pub fn current_frame(&self) -> u32 {
        self.frame / self.frame_duration
    }
}

/// Fixed table of animation templates, built once at startup. Frame counts
/// mirror the shipped art; the renderer clamps against whatever actually
/// loaded.
#[derive(Resource)]
pub struct AnimationLibrary {
    templates: HashMap<AnimKey, AnimationTemplate>,
}

impl Default for AnimationLibrary {
    fn default() -> Self {
        let mut templates = HashMap::new();
        let mut add = |key, frame_count, frame_duration, looping| {
            templates.insert(
                key,
                AnimationTemplate {
                    frame_count,
                    frame_duration,
                    looping,
                },
            );
        };
        add(AnimKey::Player(PlayerAction::Idle), 4, 6, true);
        add(AnimKey::Player(PlayerAction::Run), 8, 4, true);
        add(AnimKey::Player(PlayerAction::Jump), 1, 5, true);
        add(AnimKey::Player(PlayerAction::Slide), 1, 5, true);
        add(AnimKey::Player(PlayerAction::WallSlide), 1, 5, true);
        add(AnimKey::Enemy(EnemyAction::Idle), 4, 6, true);
        add(AnimKey::Enemy(EnemyAction::Run), 8, 4, true);
        add(AnimKey::Particle(ParticleKind::Leaf), 18, 20, false);
        add(AnimKey::Particle(ParticleKind::Dust), 4, 6, false);
        Self { templates }
    }
}

impl AnimationLibrary {
    pub fn template(&self, key: AnimKey) -> AnimationTemplate {
        self.templates.get(&key).copied().unwrap_or(AnimationTemplate {
            frame_count: 1,
            frame_duration: 5,
            looping: true,
        })
    }

    /// Fresh owned cursor for `key` (the copy-on-assign point).
    pub fn instantiate(&self, key: AnimKey) -> Animation {
        Animation::from_template(key, self.template(key))
    }
}
