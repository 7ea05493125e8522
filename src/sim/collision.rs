//! Height-aware circle-vs-wall collision for [`PhysicsBody`].
//!
//! ✔ solid walls, closed doors and un-climbable portals block
//! ✔ sub-stepped, swept and pushed-out – the centre never crosses a
//!   blocking wall line
//! ✔ earliest passable portal crossing decides the sector transition

use glam::Vec2;

use crate::sim::body::{PhysicsBody, PhysicsBodyParams};
use crate::world::{Sector, SectorId, Wall, World, segment_intersect_param};

/// Tolerance used when comparing floor deltas against a step height.
pub const STEP_EPS: f32 = 1e-6;

const MAX_SUBSTEPS: usize = 64;
const MAX_SOLVE_ITERATIONS: usize = 16;
const MIN_AUTO_SUBSTEP: f32 = 0.02;
/// Distance kept between a swept centre and the wall line it stopped at.
const SWEEP_BACKOFF: f32 = 1e-3;
/// Crossings closer than this to an earlier one are the same crossing.
const CROSSING_EPS: f32 = 1e-5;

/* ─────────────────────────  BLOCKING RULE  ───────────────────────────── */

/// Can `body` stand in `sector` with its feet at `feet_z`?
#[inline]
pub fn body_fits_in_sector(
    body: &PhysicsBody,
    sector: &Sector,
    feet_z: f32,
    params: &PhysicsBodyParams,
) -> bool {
    feet_z + body.height <= sector.ceil_z - params.headroom_epsilon
}

/// Return `true` if `wall` stops `body` when approached from `p`'s side.
pub fn wall_blocks_body(
    world: &World,
    wall: &Wall,
    body: &PhysicsBody,
    p: Vec2,
    params: &PhysicsBodyParams,
) -> bool {
    /* ----- 1. solid walls and closed doors ------------------------------ */
    if wall.back_sector.is_none() || wall.door_blocked() {
        return true;
    }

    /* ----- 2. both sides must be real sectors --------------------------- */
    let Some(from_id) = world.wall_sector_for_point(wall, p) else {
        return true;
    };
    let Some(to_id) = wall.other_sector(from_id) else {
        return true;
    };
    let (Some(from), Some(to)) = (world.sector(from_id), world.sector(to_id)) else {
        return true;
    };

    /* ----- 3. step-up limit --------------------------------------------- */
    let step = to.floor_z - from.floor_z;
    if step > body.step_height + STEP_EPS {
        return true;
    }

    /* ----- 4. headroom at the feet height we would end up with ---------- */
    let dest_feet_z = if step > STEP_EPS { to.floor_z } else { body.z };
    !body_fits_in_sector(body, to, dest_feet_z, params)
}

/* ─────────────────────────  PUSH-OUT / SLIDE  ────────────────────────── */

/// One pass over all walls: push `pos` out of every blocking wall closer than
/// the body radius and strip the inward part of `vel`.
fn resolve_once(
    world: &World,
    body: &PhysicsBody,
    pos: &mut Vec2,
    vel: &mut Vec2,
    params: &PhysicsBodyParams,
) -> bool {
    let mut any = false;
    let r = body.radius;

    for w in &world.walls {
        let Some((a, b)) = world.wall_segment(w) else {
            continue;
        };
        if !wall_blocks_body(world, w, body, *pos, params) {
            continue;
        }
        let c = crate::world::closest_point_on_segment(a, b, *pos);
        let d = *pos - c;
        let dist2 = d.length_squared();
        if dist2 >= r * r {
            continue;
        }
        any = true;

        let dist = dist2.sqrt();
        let n = if dist > 1e-6 {
            d / dist
        } else {
            // Centre sits on the wall: fall back to the wall's left normal.
            let e = b - a;
            let len = e.length();
            if len > 1e-6 {
                Vec2::new(-e.y, e.x) / len
            } else {
                Vec2::X
            }
        };

        *pos += n * (r - dist);

        let vn = vel.dot(n);
        if vn < 0.0 {
            *vel -= n * vn;
        }
    }
    any
}

/// Advance from `from` by `delta`, stopping just short of the first blocking
/// wall line. Returns the reached point and the fraction of `delta` that was
/// *not* travelled.
fn sweep(
    world: &World,
    body: &PhysicsBody,
    from: Vec2,
    delta: Vec2,
    params: &PhysicsBodyParams,
) -> (Vec2, f32) {
    let to = from + delta;
    let len = delta.length();
    if len <= 1e-9 {
        return (to, 0.0);
    }

    let mut best_t = f32::INFINITY;
    for w in &world.walls {
        let Some((a, b)) = world.wall_segment(w) else {
            continue;
        };
        if !wall_blocks_body(world, w, body, from, params) {
            continue;
        }
        if let Some(t) = segment_intersect_param(from, to, a, b) {
            best_t = best_t.min(t);
        }
    }

    if best_t.is_finite() {
        let t = (best_t - SWEEP_BACKOFF / len).max(0.0);
        (from + delta * t, 1.0 - t)
    } else {
        (to, 0.0)
    }
}

/// Resolve one sub-step of motion.
fn solve_substep(
    world: &World,
    body: &PhysicsBody,
    start: Vec2,
    step: Vec2,
    params: &PhysicsBodyParams,
) -> Vec2 {
    let iters = params
        .max_solve_iterations
        .clamp(1, MAX_SOLVE_ITERATIONS as u32) as usize;

    let (mut pos, mut cut) = sweep(world, body, start, step, params);
    let mut vel = step;

    for _ in 0..iters {
        if !resolve_once(world, body, &mut pos, &mut vel, params) {
            break;
        }
        // Re-apply the tangential part of whatever the sweep cut off.
        if cut > 0.0 {
            (pos, _) = sweep(world, body, pos, vel * cut, params);
            cut = 0.0;
        }
        vel = Vec2::ZERO;
    }
    pos
}

/// Where `body` ends up after trying to move by `delta`, honouring every
/// blocking wall. Does not touch the body.
pub fn move_resolved_2d(
    world: &World,
    body: &PhysicsBody,
    delta: Vec2,
    params: &PhysicsBodyParams,
) -> Vec2 {
    if world.walls.is_empty() || world.vertices.is_empty() {
        return body.pos + delta;
    }

    let dist = delta.length();
    let mut max_step = params.max_substep_dist;
    if max_step <= 1e-6 {
        max_step = (body.radius * 0.5).max(MIN_AUTO_SUBSTEP);
    }
    let steps = if dist > max_step {
        ((dist / max_step).ceil() as usize).clamp(1, MAX_SUBSTEPS)
    } else {
        1
    };
    let step = delta / steps as f32;

    let mut pos = body.pos;
    for _ in 0..steps {
        pos = solve_substep(world, body, pos, step, params);
    }
    pos
}

/* ─────────────────────────  PORTAL CROSSINGS  ────────────────────────── */

/// First passable portal of `from_sector` crossed by `p0 → p1`.
///
/// Earliest crossing wins; on equal parameters the lower wall index wins.
pub fn find_first_portal_crossing(
    world: &World,
    body: &PhysicsBody,
    from_sector: SectorId,
    p0: Vec2,
    p1: Vec2,
    params: &PhysicsBodyParams,
) -> Option<SectorId> {
    next_portal_crossing(world, body, from_sector, p0, p1, f32::NEG_INFINITY, params)
        .map(|(_, to)| to)
}

/// Like [`find_first_portal_crossing`], but only crossings strictly past the
/// segment parameter `after` count. Returns the parameter with the sector.
pub fn next_portal_crossing(
    world: &World,
    body: &PhysicsBody,
    from_sector: SectorId,
    p0: Vec2,
    p1: Vec2,
    after: f32,
    params: &PhysicsBodyParams,
) -> Option<(f32, SectorId)> {
    world.sector(from_sector)?;

    let mut best: Option<(f32, SectorId)> = None;
    for w in &world.walls {
        if w.back_sector.is_none() || !w.borders(from_sector) {
            continue;
        }
        let Some((a, b)) = world.wall_segment(w) else {
            continue;
        };
        if wall_blocks_body(world, w, body, p0, params) {
            continue;
        }
        let Some(t) = segment_intersect_param(p0, p1, a, b) else {
            continue;
        };
        if t <= after + CROSSING_EPS {
            continue;
        }
        let Some(to) = w.other_sector(from_sector) else {
            continue;
        };
        if best.is_none_or(|(bt, _)| t < bt) {
            best = Some((t, to));
        }
    }

    best.filter(|&(_, to)| world.sector(to).is_some())
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldBuilder;
    use glam::vec2;

    /// Room A (0..4) with a portal at x = 4 into room B (4..8).
    fn step_rooms(b_floor: f32, b_ceil: f32) -> World {
        let mut b = WorldBuilder::new();
        let a = b.sector(0.0, 3.0);
        let c = b.sector(b_floor, b_ceil);
        b.room(a, &[vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 4.0), vec2(0.0, 4.0)]);
        b.room(c, &[vec2(4.0, 0.0), vec2(8.0, 0.0), vec2(8.0, 4.0), vec2(4.0, 4.0)]);
        b.link_portals();
        b.build()
    }

    fn body_at(p: Vec2) -> PhysicsBody {
        let mut body = PhysicsBody::new(p, 0.0, 0.3, 1.8, 0.25);
        body.sector = Some(0);
        body
    }

    fn portal_from_a(w: &World) -> &Wall {
        w.walls
            .iter()
            .find(|wall| wall.front_sector == 0 && wall.is_portal())
            .unwrap()
    }

    #[test]
    fn solid_walls_always_block() {
        let w = step_rooms(0.0, 3.0);
        let params = PhysicsBodyParams::default();
        let solid = w.walls.iter().find(|wall| !wall.is_portal()).unwrap();
        assert!(wall_blocks_body(&w, solid, &body_at(vec2(2.0, 2.0)), vec2(2.0, 2.0), &params));
    }

    #[test]
    fn portal_blocking_follows_step_and_headroom() {
        let params = PhysicsBodyParams::default();
        let p = vec2(3.0, 2.0);

        let flat = step_rooms(0.0, 3.0);
        assert!(!wall_blocks_body(&flat, portal_from_a(&flat), &body_at(p), p, &params));

        let small = step_rooms(0.2, 3.0);
        assert!(!wall_blocks_body(&small, portal_from_a(&small), &body_at(p), p, &params));

        let tall = step_rooms(0.3, 3.0);
        assert!(wall_blocks_body(&tall, portal_from_a(&tall), &body_at(p), p, &params));

        // 0.2 + 1.8 > 2.0 - 0.08
        let low = step_rooms(0.2, 2.0);
        assert!(wall_blocks_body(&low, portal_from_a(&low), &body_at(p), p, &params));

        // dropping down is never limited by the step height
        let pit = step_rooms(-5.0, 3.0);
        assert!(!wall_blocks_body(&pit, portal_from_a(&pit), &body_at(p), p, &params));
    }

    #[test]
    fn closed_door_blocks() {
        let mut w = step_rooms(0.0, 3.0);
        let idx = w.walls.iter().position(|wall| wall.is_portal()).unwrap();
        w.set_door_blocked(idx as u16, true);
        let params = PhysicsBodyParams::default();
        let p = vec2(3.0, 2.0);
        assert!(wall_blocks_body(&w, portal_from_a(&w), &body_at(p), p, &params));
    }

    #[test]
    fn sweep_never_crosses_solid_wall() {
        let w = step_rooms(0.0, 3.0);
        let params = PhysicsBodyParams::default();
        let body = body_at(vec2(2.0, 2.0));
        let end = move_resolved_2d(&w, &body, vec2(-50.0, 0.0), &params);
        assert!((end.x - 0.3).abs() < 1e-3, "x = {}", end.x);
        assert!((end.y - 2.0).abs() < 1e-4);
    }

    #[test]
    fn sliding_keeps_tangential_motion() {
        let w = step_rooms(0.0, 3.0);
        let params = PhysicsBodyParams::default();
        let body = body_at(vec2(1.0, 2.0));
        let end = move_resolved_2d(&w, &body, vec2(-2.0, 1.0), &params);
        assert!((end.x - 0.3).abs() < 1e-3);
        assert!(end.y > 2.5, "slid only to {}", end.y);
    }

    #[test]
    fn portal_crossing_reports_destination() {
        let w = step_rooms(0.1, 3.0);
        let params = PhysicsBodyParams::default();
        let body = body_at(vec2(3.5, 2.0));
        let to = find_first_portal_crossing(&w, &body, 0, vec2(3.5, 2.0), vec2(4.5, 2.0), &params);
        assert_eq!(to, Some(1));
        let none = find_first_portal_crossing(&w, &body, 0, vec2(3.5, 2.0), vec2(3.9, 2.0), &params);
        assert_eq!(none, None);
        // unknown origin sector fails soft
        assert_eq!(
            find_first_portal_crossing(&w, &body, 42, vec2(3.5, 2.0), vec2(4.5, 2.0), &params),
            None
        );
    }

    #[test]
    fn empty_world_moves_freely() {
        let w = World::default();
        let body = body_at(vec2(1.0, 1.0));
        let end = move_resolved_2d(&w, &body, vec2(3.0, -1.0), &PhysicsBodyParams::default());
        assert_eq!(end, vec2(4.0, 0.0));
    }

    #[test]
    fn chained_crossings_are_found_in_order() {
        let mut b = WorldBuilder::new();
        for i in 0..3 {
            let s = b.sector(0.0, 3.0);
            let x = i as f32;
            b.room(s, &[vec2(x, 0.0), vec2(x + 1.0, 0.0), vec2(x + 1.0, 4.0), vec2(x, 4.0)]);
        }
        b.link_portals();
        let w = b.build();
        let params = PhysicsBodyParams::default();
        let body = body_at(vec2(0.5, 2.0));
        let (p0, p1) = (vec2(0.5, 2.0), vec2(2.5, 2.0));

        let (t1, s1) = next_portal_crossing(&w, &body, 0, p0, p1, f32::NEG_INFINITY, &params).unwrap();
        assert_eq!(s1, 1);
        assert!((t1 - 0.25).abs() < 1e-5);
        // the way back through the same portal is not a new crossing
        let (t2, s2) = next_portal_crossing(&w, &body, s1, p0, p1, t1, &params).unwrap();
        assert_eq!(s2, 2);
        assert!((t2 - 0.75).abs() < 1e-5);
        assert_eq!(next_portal_crossing(&w, &body, s2, p0, p1, t2, &params), None);
    }
}
