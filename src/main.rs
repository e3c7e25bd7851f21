mod animation;
mod audio;
mod camera;
mod clouds;
mod components;
mod enemy;
mod flow;
mod input;
mod level;
mod particles;
mod physics_core;
mod player;
mod projectile;
mod render;
mod screen_effects;
mod spark;
mod sprites;
mod tilemap;

use bevy::prelude::*;

use components::{GameConfig, HeadlessMode, SimRng};
use flow::GameFlow;

/// Per-tick simulation order. One `FixedUpdate` run is one tick: entity
/// updates (enemies, then the player), projectiles, transient effects,
/// camera scroll, then level lifecycle.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    Entities,
    Projectiles,
    Effects,
    Camera,
    Lifecycle,
}

#[derive(serde::Deserialize, Default)]
struct StartupConfig {
    window_title: Option<String>,
    window_width: Option<f32>,
    window_height: Option<f32>,
    background_color: Option<[f32; 3]>,
    texture_filter: Option<String>,
    assets_dir: Option<String>,
    map_path: Option<String>,
}

fn load_startup_config() -> StartupConfig {
    let path = std::env::var("EMBER_GAME_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "game.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<StartupConfig>(&contents) {
            Ok(config) => {
                println!("[Ember] loaded startup config from {path}");
                config
            }
            Err(e) => {
                eprintln!("[Ember] failed to parse {path}: {e}");
                StartupConfig::default()
            }
        },
        Err(_) => StartupConfig::default(),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let headless = args.iter().any(|a| a == "--headless");
    let startup_config = load_startup_config();

    let mut app = App::new();
    app.insert_resource(HeadlessMode(headless));

    if headless {
        // No window, no rendering, no audio; the simulation still runs at
        // the full fixed rate.
        app.add_plugins(MinimalPlugins);
        app.add_plugins(bevy::state::app::StatesPlugin);
        app.insert_state(GameFlow::Playing);
        println!("[Ember] starting in HEADLESS mode");
    } else {
        let assets_dir = std::env::var("EMBER_ASSETS_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .or(startup_config.assets_dir)
            .unwrap_or_else(|| "assets".to_string());
        // Pixel art wants nearest filtering unless the config opts out.
        let nearest = std::env::var("EMBER_TEXTURE_FILTER")
            .ok()
            .filter(|s| !s.is_empty())
            .or(startup_config.texture_filter)
            .map_or(true, |v| !v.eq_ignore_ascii_case("linear"));

        let window_title = startup_config
            .window_title
            .unwrap_or_else(|| "Ember".to_string());
        let window_width = startup_config.window_width.unwrap_or(640.0);
        let window_height = startup_config.window_height.unwrap_or(480.0);

        let mut plugins = DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: window_title,
                    resolution: (window_width, window_height).into(),
                    present_mode: bevy::window::PresentMode::AutoVsync,
                    ..default()
                }),
                ..default()
            })
            .set(bevy::asset::AssetPlugin {
                file_path: assets_dir,
                ..default()
            });
        if nearest {
            plugins = plugins.set(ImagePlugin::default_nearest());
        }
        app.add_plugins(plugins);
        app.init_state::<GameFlow>();

        let bg = startup_config.background_color.unwrap_or([0.07, 0.5, 0.7]);
        app.insert_resource(ClearColor(Color::srgb(bg[0], bg[1], bg[2])));
        println!("[Ember] starting in WINDOWED mode");
    }

    let map_path = startup_config
        .map_path
        .map(std::path::PathBuf::from)
        .map(level::MapPath)
        .unwrap_or_default();

    app.insert_resource(Time::<Fixed>::from_hz(60.0))
        .insert_resource(GameConfig::default())
        .insert_resource(SimRng::default())
        .insert_resource(animation::AnimationLibrary::default())
        .insert_resource(tilemap::Tilemap::new(16))
        .insert_resource(map_path)
        .add_plugins(input::InputPlugin)
        .add_plugins(sprites::SpritePlugin)
        .add_plugins(audio::GameAudioPlugin)
        .add_plugins(flow::FlowPlugin)
        .add_plugins(level::LevelPlugin)
        .add_plugins(camera::CameraPlugin)
        .add_plugins(render::RenderPlugin)
        .add_plugins(screen_effects::ScreenEffectsPlugin)
        .add_plugins(clouds::CloudsPlugin);

    app.configure_sets(
        FixedUpdate,
        (
            SimSet::Entities,
            SimSet::Projectiles,
            SimSet::Effects,
            SimSet::Camera,
            SimSet::Lifecycle,
        )
            .chain()
            .run_if(in_state(GameFlow::Playing)),
    );
    app.add_systems(
        FixedUpdate,
        (
            (
                enemy::update_enemies,
                player::update_player.run_if(level::player_alive),
            )
                .chain()
                .in_set(SimSet::Entities),
            projectile::update_projectiles.in_set(SimSet::Projectiles),
            (
                particles::spawn_leaf_particles,
                particles::update_particles,
                spark::update_sparks,
                clouds::drift_clouds,
            )
                .chain()
                .in_set(SimSet::Effects),
            (camera::update_scroll, camera::decay_shake).in_set(SimSet::Camera),
            (level::tick_death_and_transition, level::reload_level)
                .chain()
                .in_set(SimSet::Lifecycle),
        ),
    );

    app.run();
}
