use std::time::{Duration, Instant};

use glam::Vec2;
use hecs::{Entity, World as Ecs};

use super::body::{PhysicsBody, PhysicsBodyParams};
use super::components::{Angle, InputCmd, Player, WishVel};
use super::sector_height::{self, FloorParams};
use super::systems;
use crate::world::World;

pub const SIM_HZ: u32 = 60;
/// Longest frame the accumulator will absorb.
const MAX_FRAME: Duration = Duration::from_millis(250);

/// Fixed-timestep accumulator: how many simulation steps a frame owes.
#[derive(Clone, Copy, Debug)]
pub struct FixedStep {
    pub dt: Duration,
    pub max_steps: u32,
    acc: Duration,
    last: Option<Instant>,
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(SIM_HZ)
    }
}

impl FixedStep {
    pub fn new(hz: u32) -> Self {
        Self {
            dt: Duration::from_secs_f64(1.0 / hz.max(1) as f64),
            max_steps: 8,
            acc: Duration::ZERO,
            last: None,
        }
    }

    #[inline]
    pub fn dt_secs(&self) -> f32 {
        self.dt.as_secs_f32()
    }

    /// Account for wall-clock time up to `now`; returns the steps to run.
    /// The very first call only records the time.
    pub fn begin_frame(&mut self, now: Instant) -> u32 {
        let Some(last) = self.last.replace(now) else {
            return 0;
        };
        let frame = now.saturating_duration_since(last).min(MAX_FRAME);
        self.acc += frame;

        let mut steps = 0;
        while self.acc >= self.dt && steps < self.max_steps {
            self.acc -= self.dt;
            steps += 1;
        }
        steps
    }

    /// Fraction of a step left in the accumulator, in `[0, 1]`.
    pub fn alpha(&self) -> f32 {
        if self.dt.is_zero() {
            return 0.0;
        }
        (self.acc.as_secs_f64() / self.dt.as_secs_f64()).clamp(0.0, 1.0) as f32
    }
}

/// Owns the actor ECS and drives all game-logic systems.
pub struct TicRunner {
    ecs: Ecs,
    pub clock: FixedStep,
    pub body_params: PhysicsBodyParams,
    pub floor_params: FloorParams,
    player: Option<Entity>,
    use_held: bool,
}

impl Default for TicRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TicRunner {
    pub fn new() -> Self {
        Self {
            ecs: Ecs::new(),
            clock: FixedStep::default(),
            body_params: PhysicsBodyParams::default(),
            floor_params: FloorParams::default(),
            player: None,
            use_held: false,
        }
    }

    #[inline]
    pub fn ecs(&self) -> &Ecs {
        &self.ecs
    }

    #[inline]
    pub fn ecs_mut(&mut self) -> &mut Ecs {
        &mut self.ecs
    }

    #[inline]
    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    /// Spawn the player at the level's start (or `fallback`) and return it.
    pub fn spawn_player(&mut self, level: &World, body: PhysicsBody, fallback: Vec2) -> Entity {
        let (pos, angle) = level
            .player_start
            .map_or((fallback, 0.0), |s| (s.pos, s.angle_deg));
        let mut body = PhysicsBody { pos, ..body };
        body.refresh_sector(level);
        if let Some(floor) = body.sector.and_then(|s| level.sector(s)).map(|s| s.floor_z) {
            body.z = floor;
        }
        let e = self
            .ecs
            .spawn((Player, body, Angle(angle), WishVel(Vec2::ZERO)));
        self.player = Some(e);
        e
    }

    /// Copy of the player's body and heading, if one is spawned.
    pub fn player_view(&self) -> Option<(PhysicsBody, f32)> {
        let e = self.player?;
        let body = *self.ecs.get::<&PhysicsBody>(e).ok()?;
        let angle = self.ecs.get::<&Angle>(e).ok()?.0;
        Some((body, angle))
    }

    /// Run as many tics as wall-clock time up to `now` owes.
    pub fn pump(&mut self, level: &mut World, now: Instant, cmd: InputCmd) -> u32 {
        let steps = self.clock.begin_frame(now);
        for _ in 0..steps {
            self.tick(level, cmd);
        }
        steps
    }

    /* ---------------------------------------------------------------- */
    /* run one fixed-rate game tic                                       */
    /* ---------------------------------------------------------------- */
    pub fn tick(&mut self, level: &mut World, cmd: InputCmd) {
        let dt = self.clock.dt_secs();

        if let Some(p) = self.player {
            systems::player_input(&mut self.ecs, p, cmd, dt);
            if cmd.use_act && !self.use_held {
                systems::use_switch(&self.ecs, level, p);
            }
        }
        self.use_held = cmd.use_act;

        systems::physics(&mut self.ecs, level, &self.body_params, dt);

        let rider = self
            .player
            .and_then(|p| self.ecs.query_one_mut::<&mut PhysicsBody>(p).ok());
        sector_height::update_movable_floors(level, rider, dt, &self.body_params, &self.floor_params);
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldBuilder;
    use glam::vec2;

    #[test]
    fn first_frame_runs_nothing() {
        let mut fs = FixedStep::new(50);
        let t0 = Instant::now();
        assert_eq!(fs.begin_frame(t0), 0);
        assert_eq!(fs.begin_frame(t0 + Duration::from_millis(70)), 3);
        assert!((fs.alpha() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn long_frames_are_capped() {
        let mut fs = FixedStep::new(50);
        let t0 = Instant::now();
        fs.begin_frame(t0);
        // 5 s is clamped to 0.25 s = 12 steps, at most 8 of them per frame
        assert_eq!(fs.begin_frame(t0 + Duration::from_secs(5)), 8);
        // the backlog is kept for later frames
        assert_eq!(fs.begin_frame(t0 + Duration::from_secs(5)), 4);
    }

    #[test]
    fn player_walks_forward() {
        let mut b = WorldBuilder::new();
        let s = b.sector(0.0, 3.0);
        b.room(s, &[vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(10.0, 10.0), vec2(0.0, 10.0)]);
        b.player_start(vec2(2.0, 5.0), 0.0);
        let mut level = b.build();

        let mut tics = TicRunner::new();
        let proto = PhysicsBody::new(Vec2::ZERO, 0.0, 0.3, 1.8, 0.25);
        tics.spawn_player(&level, proto, Vec2::ZERO);

        let cmd = InputCmd {
            forward: 1.0,
            ..Default::default()
        };
        for _ in 0..60 {
            tics.tick(&mut level, cmd);
        }
        let (body, angle) = tics.player_view().unwrap();
        assert_eq!(angle, 0.0);
        assert!((body.pos.x - (2.0 + systems::MOVE_SPEED)).abs() < 1e-2, "x = {}", body.pos.x);
        assert_eq!(body.sector, Some(0));
    }
}
