use glam::{Vec2, Vec3};

use super::collision::{self, STEP_EPS, body_fits_in_sector};
use crate::world::{SectorId, World};

/// Portals one move may pass through after the first.
const MAX_CHAINED_PORTALS: usize = 16;

/// Tuning knobs for [`PhysicsBody`]. Passed explicitly to every call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsBodyParams {
    pub gravity_z: f32,        // units / s²
    pub floor_epsilon: f32,    // snap tolerance when resting
    pub headroom_epsilon: f32, // clearance kept below ceilings
    pub step_duration_s: f32,  // time a step-up takes
    pub max_substep_dist: f32, // ≤ 0 → derived from the radius
    pub max_solve_iterations: u32,
}

impl Default for PhysicsBodyParams {
    fn default() -> Self {
        Self {
            gravity_z: -18.0,
            floor_epsilon: 1e-3,
            headroom_epsilon: 0.08,
            step_duration_s: 0.08,
            max_substep_dist: 0.10,
            max_solve_iterations: 4,
        }
    }
}

/// An interpolated climb onto a higher floor.
///
/// `from` and `to` are checked to exist when the step starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepUp {
    pub from: SectorId,
    pub to: SectorId,
    pub progress: f32, // 0 … 1
    pub duration: f32,
    pub start_z: f32,
    pub target_z: f32,
    /// Horizontal displacement withheld while climbing.
    pub deferred: Vec2,
    pub applied_fraction: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum BodyMotion {
    #[default]
    Grounded,
    Stepping(StepUp),
}

/// Vertical cylinder moved through the sector world.
///
/// `pos`/`z` are the centre on the map and the feet height. The sector is
/// `None` until the first update resolves it (or while outside every
/// sector); `last_valid_sector` is only ever a presentation fallback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsBody {
    pub pos: Vec2,
    pub z: f32,
    pub vel: Vec3,
    pub radius: f32,
    pub height: f32,
    pub step_height: f32,
    pub on_ground: bool,
    pub sector: Option<SectorId>,
    pub last_valid_sector: Option<SectorId>,
    pub motion: BodyMotion,
}

impl PhysicsBody {
    pub fn new(pos: Vec2, z: f32, radius: f32, height: f32, step_height: f32) -> Self {
        Self {
            pos,
            z,
            vel: Vec3::ZERO,
            radius,
            height,
            step_height,
            on_ground: false,
            sector: None,
            last_valid_sector: None,
            motion: BodyMotion::Grounded,
        }
    }

    #[inline]
    pub fn is_stepping(&self) -> bool {
        matches!(self.motion, BodyMotion::Stepping(_))
    }

    /// Sector to present the body in: the real one, else the last known.
    #[inline]
    pub fn display_sector(&self) -> Option<SectorId> {
        self.sector.or(self.last_valid_sector)
    }

    /// Re-resolve `sector` if it no longer names a real sector.
    pub fn refresh_sector(&mut self, world: &World) {
        if world.is_valid_sector(self.sector) {
            self.last_valid_sector = self.sector;
            return;
        }
        self.sector = world.find_sector_at_point(self.pos);
        if self.sector.is_some() {
            self.last_valid_sector = self.sector;
        }
    }

    /*──────────────────────────── movement ───────────────────────────*/

    /// Try to move horizontally by `delta`, sliding along blocking walls.
    ///
    /// Crossing a climbable portal starts a step-up instead of moving; the
    /// displacement is then applied over the next [`update`](Self::update)
    /// calls. Ignored while a step is already in progress.
    pub fn move_delta(&mut self, world: &World, delta: Vec2, params: &PhysicsBodyParams) {
        self.move_internal(world, delta, params, true, false);
    }

    /// Advance one simulation step: `wish_vel` is the desired horizontal
    /// velocity in units / s.
    pub fn update(&mut self, world: &World, wish_vel: Vec2, dt: f32, params: &PhysicsBodyParams) {
        if dt <= 0.0 {
            return;
        }
        self.refresh_sector(world);
        let p0 = self.pos;

        if let BodyMotion::Stepping(step) = self.motion {
            self.advance_step(world, step, dt, params);
            self.set_planar_velocity(p0, dt);
            return;
        }

        self.move_internal(world, wish_vel * dt, params, true, false);
        self.set_planar_velocity(p0, dt);

        let Some(floor_z) = self.sector.and_then(|s| world.sector(s)).map(|s| s.floor_z) else {
            return;
        };

        if self.on_ground {
            if self.z <= floor_z + params.floor_epsilon {
                self.z = floor_z;
                self.vel.z = 0.0;
            } else {
                self.on_ground = false;
            }
        }

        if !self.on_ground {
            self.vel.z += params.gravity_z * dt;
            self.z += self.vel.z * dt;
        }

        if self.z < floor_z {
            self.z = floor_z;
            self.vel.z = 0.0;
            self.on_ground = true;
        }

        self.clamp_to_floor_and_ceiling(world, params);
    }

    fn set_planar_velocity(&mut self, p0: Vec2, dt: f32) {
        let v = (self.pos - p0) / dt;
        self.vel.x = v.x;
        self.vel.y = v.y;
    }

    fn move_internal(
        &mut self,
        world: &World,
        delta: Vec2,
        params: &PhysicsBodyParams,
        allow_step: bool,
        while_stepping: bool,
    ) {
        if self.is_stepping() && !while_stepping {
            return;
        }

        let old_sector = self.sector;
        let old_pos = self.pos;

        let from_sector = self
            .sector
            .filter(|&s| world.sector(s).is_some())
            .or_else(|| world.find_sector_at_point(old_pos));

        let resolved = collision::move_resolved_2d(world, self, delta, params);

        let crossing = from_sector.and_then(|from| {
            collision::next_portal_crossing(
                world,
                self,
                from,
                old_pos,
                resolved,
                f32::NEG_INFINITY,
                params,
            )
        });

        if allow_step
            && let (Some(from), Some((_, to))) = (from_sector, crossing)
            && self.try_start_step_up(world, from, to, resolved - old_pos, params)
        {
            self.pos = old_pos;
            self.sector = Some(from);
            self.last_valid_sector = Some(from);
            return;
        }

        // A long move may pass several portals; follow them to the last one.
        let landed = crossing.map(|(mut t, mut cur)| {
            for _ in 0..MAX_CHAINED_PORTALS {
                let Some((next_t, next)) = collision::next_portal_crossing(
                    world, self, cur, old_pos, resolved, t, params,
                ) else {
                    break;
                };
                (t, cur) = (next_t, next);
            }
            cur
        });

        self.pos = resolved;
        match landed.or(from_sector) {
            Some(s) => {
                self.sector = Some(s);
                self.last_valid_sector = Some(s);
            }
            None => {
                self.sector = None;
                self.refresh_sector(world);
            }
        }

        self.handle_step_down(world, old_sector, params);
        self.clamp_to_floor_and_ceiling(world, params);
    }

    /*──────────────────────────── step-up ────────────────────────────*/

    fn try_start_step_up(
        &mut self,
        world: &World,
        from: SectorId,
        to: SectorId,
        deferred: Vec2,
        params: &PhysicsBodyParams,
    ) -> bool {
        let (Some(src), Some(dst)) = (world.sector(from), world.sector(to)) else {
            return false;
        };
        let rise = dst.floor_z - src.floor_z;
        if rise <= STEP_EPS || rise > self.step_height + STEP_EPS {
            return false;
        }
        if !body_fits_in_sector(self, dst, dst.floor_z, params) {
            return false;
        }

        tracing::debug!(from, to, rise, "step-up start");
        self.motion = BodyMotion::Stepping(StepUp {
            from,
            to,
            progress: 0.0,
            duration: params.step_duration_s,
            start_z: self.z,
            target_z: dst.floor_z,
            deferred,
            applied_fraction: 0.0,
        });
        self.vel.z = 0.0;
        self.on_ground = true;
        true
    }

    fn advance_step(&mut self, world: &World, mut step: StepUp, dt: f32, params: &PhysicsBodyParams) {
        let duration = step.duration.max(1e-4);
        step.progress = (step.progress + dt / duration).min(1.0);

        let fraction = (step.progress - step.applied_fraction).max(0.0);
        if fraction > 0.0 {
            self.move_internal(world, step.deferred * fraction, params, false, true);
            // The origin floor stays authoritative until the climb is done.
            if world.sector(step.from).is_some() {
                self.sector = Some(step.from);
                self.last_valid_sector = Some(step.from);
            }
        }
        step.applied_fraction = step.progress;

        self.z = step.start_z + (step.target_z - step.start_z) * step.progress;
        self.vel.z = 0.0;
        self.on_ground = true;

        if step.progress >= 1.0 {
            self.z = step.target_z;
            self.motion = BodyMotion::Grounded;
            if world.sector(step.to).is_some() {
                self.sector = Some(step.to);
                self.last_valid_sector = Some(step.to);
            }
            tracing::debug!(to = step.to, z = self.z, "step-up done");
        } else {
            self.motion = BodyMotion::Stepping(step);
        }
    }

    /*──────────────────────────── vertical ───────────────────────────*/

    /// Walking off a ledge releases the ground contact without snapping.
    fn handle_step_down(
        &mut self,
        world: &World,
        old_sector: Option<SectorId>,
        params: &PhysicsBodyParams,
    ) {
        let (Some(old), Some(new)) = (
            old_sector.and_then(|s| world.sector(s)),
            self.sector.and_then(|s| world.sector(s)),
        ) else {
            return;
        };
        if new.floor_z < old.floor_z - params.floor_epsilon
            && (self.z - old.floor_z).abs() <= params.floor_epsilon
        {
            self.on_ground = false;
            self.vel.z = 0.0;
        }
    }

    fn clamp_to_floor_and_ceiling(&mut self, world: &World, params: &PhysicsBodyParams) {
        let Some(sector) = self.sector.and_then(|s| world.sector(s)) else {
            return;
        };
        let z_min = sector.floor_z;
        let mut ceil = sector.ceil_z;
        if let BodyMotion::Stepping(step) = self.motion {
            for id in [step.from, step.to] {
                if let Some(s) = world.sector(id) {
                    ceil = ceil.min(s.ceil_z);
                }
            }
        }
        let z_max = (ceil - params.headroom_epsilon - self.height).max(z_min);

        if self.z < z_min {
            self.z = z_min;
            self.vel.z = 0.0;
            self.on_ground = true;
        }
        if self.z > z_max {
            self.z = z_max;
            if self.vel.z > 0.0 {
                self.vel.z = 0.0;
            }
        }
        if (self.z - z_min).abs() <= params.floor_epsilon && self.vel.z <= 0.0 {
            self.z = z_min;
            self.vel.z = 0.0;
            self.on_ground = true;
        }
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
