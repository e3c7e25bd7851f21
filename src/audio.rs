use std::collections::HashMap;

use bevy::audio::Volume;
use bevy::prelude::*;

use crate::components::HeadlessMode;

/// The fixed sound roster. Volumes are the shipped mix; music and ambience
/// loop on their own channels from startup.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Sfx {
    Jump,
    Dash,
    Hit,
    Shoot,
    Ambience,
}

impl Sfx {
    pub fn path(self) -> &'static str {
        match self {
            Sfx::Jump => "audio/jump.wav",
            Sfx::Dash => "audio/dash.wav",
            Sfx::Hit => "audio/hit.wav",
            Sfx::Shoot => "audio/shoot.wav",
            Sfx::Ambience => "audio/ambience.wav",
        }
    }

    pub fn volume(self) -> f32 {
        match self {
            Sfx::Jump => 0.7,
            Sfx::Dash => 0.3,
            Sfx::Hit => 0.8,
            Sfx::Shoot => 0.4,
            Sfx::Ambience => 0.2,
        }
    }
}

const MUSIC_PATH: &str = "audio/music.wav";
const MUSIC_VOLUME: f32 = 0.5;

/// Fire-and-forget playback request; gameplay systems send these and never
/// hear back.
#[derive(Event, Clone, Copy, Debug)]
pub struct PlaySfx(pub Sfx);

#[derive(Resource, Default)]
pub struct AudioLibrary {
    sounds: HashMap<Sfx, Handle<AudioSource>>,
    pub enabled: bool,
}

pub struct GameAudioPlugin;

impl Plugin for GameAudioPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PlaySfx>()
            .insert_resource(AudioLibrary::default())
            .add_systems(PreStartup, load_audio)
            .add_systems(Startup, start_music)
            .add_systems(Update, play_sfx_events);
    }
}

fn load_audio(
    mut library: ResMut<AudioLibrary>,
    headless: Res<HeadlessMode>,
    asset_server: Option<Res<AssetServer>>,
) {
    let Some(asset_server) = asset_server else {
        return;
    };
    if headless.0 {
        return;
    }
    for sfx in [Sfx::Jump, Sfx::Dash, Sfx::Hit, Sfx::Shoot, Sfx::Ambience] {
        library.sounds.insert(sfx, asset_server.load(sfx.path()));
    }
    library.enabled = true;
}

/// Background music and the ambience bed both run as single always-on
/// looping channels.
fn start_music(
    mut commands: Commands,
    library: Res<AudioLibrary>,
    asset_server: Option<Res<AssetServer>>,
) {
    let Some(asset_server) = asset_server else {
        return;
    };
    if !library.enabled {
        return;
    }
    commands.spawn((
        AudioPlayer::new(asset_server.load(MUSIC_PATH)),
        PlaybackSettings::LOOP.with_volume(Volume::new(MUSIC_VOLUME)),
    ));
    if let Some(ambience) = library.sounds.get(&Sfx::Ambience) {
        commands.spawn((
            AudioPlayer::new(ambience.clone()),
            PlaybackSettings::LOOP.with_volume(Volume::new(Sfx::Ambience.volume())),
        ));
    }
}

fn play_sfx_events(
    mut commands: Commands,
    library: Res<AudioLibrary>,
    mut events: EventReader<PlaySfx>,
) {
    for PlaySfx(sfx) in events.read().copied() {
        if !library.enabled {
            continue;
        }
        let Some(handle) = library.sounds.get(&sfx) else {
            continue;
        };
        commands.spawn((
            AudioPlayer::new(handle.clone()),
            PlaybackSettings::DESPAWN.with_volume(Volume::new(sfx.volume())),
        ));
    }
}
