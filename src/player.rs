use bevy::prelude::*;
use rand::Rng;

use crate::animation::{AnimKey, Animation, AnimationLibrary};
use crate::audio::{PlaySfx, Sfx};
use crate::components::{GameConfig, ParticleKind, Player, PlayerAction, SimRng};
use crate::input::{Action, VirtualInput};
use crate::level::LevelState;
use crate::particles::spawn_particle;
use crate::physics_core::{step_body, Body};
use crate::tilemap::Tilemap;

/// Ticks of air time before contact counts as "airborne" for wall slides and
/// the jump animation.
const AIR_GRACE: u32 = 4;

#[derive(Component, Clone, Debug)]
pub struct PlayerState {
    /// Signed dash countdown; the sign is the dash direction, the magnitude
    /// counts down to zero. Above the impact threshold the player is
    /// ballistic (and invisible).
    pub dashing: i32,
    pub air_time: u32,
    pub jumps: u32,
    pub wall_slide: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            dashing: 0,
            air_time: 0,
            jumps: 1,
            wall_slide: false,
        }
    }
}

/// Current action plus the owned animation cursor. Swapping actions resets
/// the cursor; setting the same action is a no-op so an in-progress animation
/// never restarts.
#[derive(Component)]
pub struct PlayerAnim {
    pub action: PlayerAction,
    pub anim: Animation,
}

impl PlayerAnim {
    pub fn new(library: &AnimationLibrary) -> Self {
        Self {
            action: PlayerAction::Idle,
            anim: library.instantiate(AnimKey::Player(PlayerAction::Idle)),
        }
    }

    pub fn set(&mut self, action: PlayerAction, library: &AnimationLibrary) {
        if action != self.action {
            self.action = action;
            self.anim = library.instantiate(AnimKey::Player(action));
        }
    }
}

/// Spend a jump. Wall slides turn into a wall jump that kicks away from the
/// wall; otherwise one jump of the budget is consumed. Returns whether a jump
/// actually happened (the caller keys the jump sound off this).
pub fn try_jump(config: &GameConfig, state: &mut PlayerState, body: &mut Body) -> bool {
    if state.wall_slide {
        if body.flip && body.last_movement.x < 0.0 {
            body.velocity.x = config.wall_jump_kick.0;
            body.velocity.y = -config.wall_jump_kick.1;
            state.air_time = AIR_GRACE + 1;
            state.jumps = state.jumps.saturating_sub(1);
            return true;
        }
        if !body.flip && body.last_movement.x > 0.0 {
            body.velocity.x = -config.wall_jump_kick.0;
            body.velocity.y = -config.wall_jump_kick.1;
            state.air_time = AIR_GRACE + 1;
            state.jumps = state.jumps.saturating_sub(1);
            return true;
        }
        return false;
    }
    if state.jumps > 0 {
        body.velocity.y = -config.jump_velocity;
        state.jumps -= 1;
        state.air_time = AIR_GRACE + 1;
        return true;
    }
    false
}

/// Start a dash along the current facing. A dash already in flight (or
/// cooling down) blocks the trigger.
pub fn try_dash(config: &GameConfig, state: &mut PlayerState, body: &Body) -> bool {
    if state.dashing != 0 {
        return false;
    }
    state.dashing = if body.flip {
        -config.dash_ticks
    } else {
        config.dash_ticks
    };
    true
}

pub fn update_player(
    config: Res<GameConfig>,
    tilemap: Res<Tilemap>,
    library: Res<AnimationLibrary>,
    input: Res<VirtualInput>,
    mut rng: ResMut<SimRng>,
    mut level: ResMut<LevelState>,
    mut sfx: EventWriter<PlaySfx>,
    mut commands: Commands,
    mut players: Query<(&mut Body, &mut PlayerState, &mut PlayerAnim), With<Player>>,
) {
    use std::f32::consts::TAU;
    let Ok((mut body, mut state, mut anim)) = players.get_single_mut() else {
        return;
    };

    if input.just_pressed(Action::Jump) && try_jump(&config, &mut state, &mut body) {
        sfx.send(PlaySfx(Sfx::Jump));
    }
    if input.just_pressed(Action::Dash) && try_dash(&config, &mut state, &body) {
        sfx.send(PlaySfx(Sfx::Dash));
    }

    let movement = Vec2::new(
        input.pressed(Action::Right) as i32 as f32 - input.pressed(Action::Left) as i32 as f32,
        0.0,
    );

    step_body(&tilemap, &config, &mut body, movement);

    if !state.wall_slide {
        state.air_time += 1;
    }
    if state.air_time > config.max_air_time {
        level.dead += 1;
    }

    if body.collisions.down {
        state.air_time = 0;
        state.jumps = config.max_jumps;
    }

    state.wall_slide = false;
    if (body.collisions.right || body.collisions.left) && state.air_time > AIR_GRACE {
        state.wall_slide = true;
        body.velocity.y = body.velocity.y.min(config.wall_slide_cap);
        body.flip = !body.collisions.right;
        anim.set(PlayerAction::WallSlide, &library);
    }

    if !state.wall_slide {
        if state.air_time > AIR_GRACE {
            anim.set(PlayerAction::Jump, &library);
        } else if movement.x != 0.0 {
            anim.set(PlayerAction::Run, &library);
        } else {
            anim.set(PlayerAction::Idle, &library);
        }
    }

    // Bursts fire on the exact entry and exit ticks of the ballistic window.
    let magnitude = state.dashing.abs();
    if magnitude == config.dash_ticks || magnitude == config.dash_impact_ticks {
        for _ in 0..20 {
            let angle = rng.0.gen::<f32>() * TAU;
            let speed = rng.0.gen::<f32>() * 0.5 + 0.5;
            spawn_particle(
                &mut commands,
                &library,
                ParticleKind::Dust,
                body.center(),
                Vec2::new(angle.cos(), angle.sin()) * speed,
                rng.0.gen_range(0..8),
            );
        }
    }
    if state.dashing > 0 {
        state.dashing -= 1;
    }
    if state.dashing < 0 {
        state.dashing += 1;
    }
    if state.dashing.abs() > config.dash_impact_ticks {
        let sign = state.dashing.signum() as f32;
        body.velocity.x = sign * config.dash_speed;
        // One-tick taper on the last ballistic tick so the dash doesn't
        // overshoot into the cooldown.
        if state.dashing.abs() == config.dash_impact_ticks + 1 {
            body.velocity.x *= 0.1;
        }
        spawn_particle(
            &mut commands,
            &library,
            ParticleKind::Dust,
            body.center(),
            Vec2::new(sign * rng.0.gen::<f32>() * 3.0, 0.0),
            rng.0.gen_range(0..8),
        );
    }

    if body.velocity.x > 0.0 {
        body.velocity.x = (body.velocity.x - config.friction).max(0.0);
    } else {
        body.velocity.x = (body.velocity.x + config.friction).min(0.0);
    }

    anim.anim.update();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TileKind;
    use bevy::ecs::system::RunSystemOnce;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn player_world(map: Tilemap) -> World {
        let mut world = World::new();
        world.insert_resource(GameConfig::default());
        world.insert_resource(map);
        world.insert_resource(AnimationLibrary::default());
        world.insert_resource(VirtualInput::default());
        world.insert_resource(SimRng(SmallRng::seed_from_u64(5)));
        world.insert_resource(LevelState::default());
        world.init_resource::<Events<PlaySfx>>();
        world
    }

    fn floor_map() -> Tilemap {
        let mut map = Tilemap::new(16);
        for x in -4..8 {
            map.insert(TileKind::Grass, 0, (x, 2));
        }
        map
    }

    fn spawn_player(world: &mut World, pos: Vec2) {
        let library = world.resource::<AnimationLibrary>();
        let anim = PlayerAnim::new(library);
        world.spawn((
            Player,
            Body::new(pos, Vec2::new(8.0, 15.0)),
            PlayerState::default(),
            anim,
        ));
    }

    fn press(world: &mut World, action: Action) {
        let mut input = world.resource_mut::<VirtualInput>();
        input.active.insert(action);
        input.just_pressed.insert(action);
    }

    fn release_all(world: &mut World) {
        let mut input = world.resource_mut::<VirtualInput>();
        input.active.clear();
        input.just_pressed.clear();
    }

    fn tick(world: &mut World) {
        world.run_system_once(update_player).expect("update player");
        let mut input = world.resource_mut::<VirtualInput>();
        input.just_pressed.clear();
    }

    fn player_state(world: &mut World) -> (Body, PlayerState) {
        let mut query = world.query::<(&Body, &PlayerState)>();
        let (body, state) = query.single(world);
        (body.clone(), state.clone())
    }

    #[test]
    fn jump_budget_is_one_until_landing() {
        // Standing on the floor at y=17 (feet on the tile row at y=32).
        let mut world = player_world(floor_map());
        spawn_player(&mut world, Vec2::new(0.0, 17.0));
        tick(&mut world);
        let (_, state) = player_state(&mut world);
        assert_eq!(state.jumps, 1);

        press(&mut world, Action::Jump);
        tick(&mut world);
        let (body, state) = player_state(&mut world);
        assert_eq!(state.jumps, 0);
        assert!(body.velocity.y < 0.0);

        // A second press mid-air is a no-op.
        press(&mut world, Action::Jump);
        tick(&mut world);
        let (body_after, state) = player_state(&mut world);
        assert_eq!(state.jumps, 0);
        assert!(body_after.velocity.y > body.velocity.y);

        // Ride the arc back down; landing restores the budget.
        release_all(&mut world);
        for _ in 0..200 {
            tick(&mut world);
            let (body, _) = player_state(&mut world);
            if body.collisions.down {
                break;
            }
        }
        let (body, state) = player_state(&mut world);
        assert!(body.collisions.down);
        assert_eq!(state.jumps, 1);
        assert_eq!(state.air_time, 0);
    }

    #[test]
    fn dash_ballistic_window_lasts_ten_ticks() {
        let mut world = player_world(floor_map());
        spawn_player(&mut world, Vec2::new(0.0, 17.0));

        press(&mut world, Action::Dash);
        tick(&mut world);
        let (body, state) = player_state(&mut world);
        assert_eq!(state.dashing, 59);
        assert_eq!(body.velocity.x, config_speed_after_first_tick());

        for _ in 0..8 {
            tick(&mut world);
        }
        let (body, state) = player_state(&mut world);
        // Tick 9 is the taper tick: 8.0 * 0.1 - friction.
        assert_eq!(state.dashing, 51);
        assert!((body.velocity.x - 0.7).abs() < 1e-4);

        tick(&mut world);
        let (body, state) = player_state(&mut world);
        assert_eq!(state.dashing, 50);
        assert!((body.velocity.x - 0.6).abs() < 1e-4);

        // Re-triggering mid-countdown is blocked.
        press(&mut world, Action::Dash);
        tick(&mut world);
        let (_, state) = player_state(&mut world);
        assert_eq!(state.dashing, 49);
    }

    fn config_speed_after_first_tick() -> f32 {
        let config = GameConfig::default();
        config.dash_speed - config.friction
    }

    #[test]
    fn dash_bursts_fire_at_both_thresholds() {
        let mut world = player_world(floor_map());
        spawn_player(&mut world, Vec2::new(0.0, 17.0));

        let dust_count = |world: &mut World| {
            let mut q = world.query::<&crate::particles::Particle>();
            q.iter(world).count()
        };

        press(&mut world, Action::Dash);
        tick(&mut world);
        // Entry burst of 20 plus the first stream particle.
        assert_eq!(dust_count(&mut world), 21);

        release_all(&mut world);
        for _ in 0..9 {
            tick(&mut world);
        }
        let before_exit = dust_count(&mut world);
        tick(&mut world);
        // Exit tick: |dashing| == 50 sheds another 20 (minus any that aged out,
        // which can't happen inside 11 ticks of a 24-tick dust cycle).
        assert_eq!(dust_count(&mut world), before_exit + 20);
    }

    #[test]
    fn wall_slide_caps_fall_speed_and_faces_away() {
        let mut map = floor_map();
        for y in -4..2 {
            map.insert(TileKind::Stone, 0, (1, y));
        }
        let mut world = player_world(map);
        // Airborne, hugging the wall at x=16 on the right.
        spawn_player(&mut world, Vec2::new(8.0, -20.0));
        {
            let mut query = world.query::<&mut PlayerState>();
            query.single_mut(&mut world).air_time = 10;
        }

        press(&mut world, Action::Right);
        for _ in 0..3 {
            tick(&mut world);
        }
        let (body, state) = player_state(&mut world);
        assert!(state.wall_slide);
        assert!(body.velocity.y <= 0.5);
        assert!(!body.flip);
        let mut query = world.query::<&PlayerAnim>();
        assert_eq!(query.single(&world).action, PlayerAction::WallSlide);
    }

    #[test]
    fn overlong_airtime_marks_the_player_dead() {
        let mut world = player_world(Tilemap::new(16));
        spawn_player(&mut world, Vec2::ZERO);
        for _ in 0..120 {
            tick(&mut world);
        }
        assert_eq!(world.resource::<LevelState>().dead, 0);
        tick(&mut world);
        assert_eq!(world.resource::<LevelState>().dead, 1);
    }
}
