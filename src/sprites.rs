use std::collections::HashMap;

use bevy::prelude::*;

use crate::components::HeadlessMode;

/// Every frame sequence the game requests, as flat keys into the assets
/// directory: `assets/images/<key>/<index>.png`. Counts mirror the shipped
/// art; lookups clamp, so shorter art degrades instead of panicking.
const SPRITE_MANIFEST: &[(&str, u32)] = &[
    ("tiles/grass", 9),
    ("tiles/stone", 9),
    ("tiles/decor", 3),
    ("tiles/large_decor", 3),
    ("tiles/spawners", 2),
    ("entities/player/idle", 4),
    ("entities/player/run", 8),
    ("entities/player/jump", 1),
    ("entities/player/slide", 1),
    ("entities/player/wall_slide", 1),
    ("entities/enemy/idle", 4),
    ("entities/enemy/run", 8),
    ("particles/leaf", 18),
    ("particles/particle", 4),
    ("clouds", 2),
    ("projectile", 1),
];

/// The asset namespace: flat string key -> loaded image variants. The
/// simulation never touches this; only render-side systems ask for frames,
/// and every caller carries a colored-rect fallback for missing art.
#[derive(Resource, Default)]
pub struct SpriteLibrary {
    images: HashMap<&'static str, Vec<Handle<Image>>>,
    pub enabled: bool,
}

impl SpriteLibrary {
    pub fn insert(&mut self, key: &'static str, frames: Vec<Handle<Image>>) {
        self.images.insert(key, frames);
    }

    pub fn frames(&self, key: &str) -> Option<&[Handle<Image>]> {
        if !self.enabled {
            return None;
        }
        self.images
            .get(key)
            .map(Vec::as_slice)
            .filter(|frames| !frames.is_empty())
    }

    /// Frame at `index`, clamped to the last loaded image.
    pub fn frame(&self, key: &str, index: u32) -> Option<Handle<Image>> {
        let frames = self.frames(key)?;
        frames.get((index as usize).min(frames.len() - 1)).cloned()
    }
}

pub struct SpritePlugin;

impl Plugin for SpritePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SpriteLibrary::default())
            .add_systems(PreStartup, load_sprites);
    }
}

fn load_sprites(
    mut library: ResMut<SpriteLibrary>,
    headless: Res<HeadlessMode>,
    asset_server: Option<Res<AssetServer>>,
) {
    let Some(asset_server) = asset_server else {
        return;
    };
    if headless.0 {
        return;
    }
    for (key, count) in SPRITE_MANIFEST {
        let frames = (0..*count)
            .map(|i| asset_server.load(format!("images/{key}/{i}.png")))
            .collect();
        library.insert(*key, frames);
    }
    library.enabled = true;
    info!(
        "sprite library: {} sequences registered",
        SPRITE_MANIFEST.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_library_returns_nothing() {
        let mut library = SpriteLibrary::default();
        library.insert("tiles/grass", vec![Handle::default()]);
        assert!(library.frames("tiles/grass").is_none());
        library.enabled = true;
        assert!(library.frames("tiles/grass").is_some());
    }

    #[test]
    fn frame_lookup_clamps_to_available_art() {
        let mut library = SpriteLibrary {
            enabled: true,
            ..Default::default()
        };
        library.insert("clouds", vec![Handle::default(), Handle::default()]);
        assert!(library.frame("clouds", 7).is_some());
        assert!(library.frame("missing", 0).is_none());
    }
}
