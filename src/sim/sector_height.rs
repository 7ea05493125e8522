//! Switch-driven floors that travel between two heights.

use crate::sim::body::{PhysicsBody, PhysicsBodyParams};
use crate::world::{Sector, WallFlags, WallId, World, closest_point_on_segment};

/// Floors count as "at" a height within this tolerance.
const AT_EPS: f32 = 1e-4;
/// Extra reach beyond the body radius when touching a switch.
const TOUCH_EPS: f32 = 0.03;
/// How far above the floor a grounded rider may be and still be carried.
const RIDE_SLACK: f32 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloorParams {
    pub speed: f32, // units / s
}

impl Default for FloorParams {
    fn default() -> Self {
        Self { speed: 2.0 }
    }
}

#[inline]
fn is_at(a: f32, b: f32) -> bool {
    (a - b).abs() <= AT_EPS
}

fn any_floor_moving(world: &World) -> bool {
    world
        .sectors
        .iter()
        .any(|s| s.movable.is_some_and(|m| m.moving))
}

/// "Use" pressed by `body`: start the floor bound to the nearest switch wall
/// it touches. Returns `true` if a move was started.
///
/// Only one floor moves at a time; a floor is only toggled from rest at one
/// of its two endpoints.
pub fn try_toggle_touching_wall(world: &mut World, body: &PhysicsBody) -> bool {
    if world.walls.is_empty() || world.vertices.is_empty() || any_floor_moving(world) {
        return false;
    }
    let Some(body_sector) = body.sector.filter(|&s| world.sector(s).is_some()) else {
        return false;
    };

    /* ----- nearest switch on the body's side ------------------------- */
    let reach = body.radius + TOUCH_EPS;
    let mut best: Option<(f32, usize)> = None;
    for (i, w) in world.walls.iter().enumerate() {
        if !w.flags.contains(WallFlags::TOGGLE_SECTOR) {
            continue;
        }
        let Some((a, b)) = world.wall_segment(w) else {
            continue;
        };
        if world.wall_sector_for_point(w, body.pos) != Some(body_sector) {
            continue;
        }
        let d2 = body.pos.distance_squared(closest_point_on_segment(a, b, body.pos));
        if d2 > reach * reach {
            continue;
        }
        if best.is_none_or(|(bd, _)| d2 < bd) {
            best = Some((d2, i));
        }
    }
    let Some((_, wall_idx)) = best else {
        return false;
    };

    /* ----- resolve the target floor ---------------------------------- */
    let wall = &world.walls[wall_idx];
    let oneshot = wall.flags.contains(WallFlags::TOGGLE_ONESHOT);
    let target = match wall.toggle.and_then(|t| t.sector_id) {
        Some(id) => world.sector_index_by_id(id),
        None => Some(body_sector),
    };
    let Some(target) = target else {
        return false;
    };
    let Some(sector) = world.sector_mut(target) else {
        return false;
    };
    let floor_z = sector.floor_z;
    let Some(m) = sector.movable.as_mut() else {
        return false;
    };
    if m.moving || (oneshot && is_at(floor_z, m.toggled_z)) {
        return false;
    }

    let dest = if is_at(floor_z, m.toggled_z) {
        m.origin_z
    } else if is_at(floor_z, m.origin_z) {
        m.toggled_z
    } else {
        return false;
    };

    m.target_z = dest;
    m.moving = true;
    m.toggle_wall = Some(wall_idx as WallId);
    tracing::debug!(sector = target, wall = wall_idx, from = floor_z, to = dest, "floor toggle");
    true
}

/// Would `rider` still fit under the ceiling once the floor moves by `delta`?
fn rider_fits(
    sector: &Sector,
    rider: &PhysicsBody,
    old_floor: f32,
    new_floor: f32,
    delta: f32,
    params: &PhysicsBodyParams,
) -> bool {
    let mut feet = rider.z.max(new_floor);
    if rider.on_ground && (rider.z - old_floor).abs() <= params.floor_epsilon + RIDE_SLACK {
        feet = (rider.z + delta).max(new_floor);
    }
    feet + rider.height <= sector.ceil_z - params.headroom_epsilon
}

/// Switch texture of the wall that triggered a finished move.
fn apply_toggle_texture(world: &mut World, wall: Option<WallId>, floor_z: f32, origin_z: f32, toggled_z: f32) {
    let Some(w) = wall.and_then(|i| world.walls.get_mut(i as usize)) else {
        return;
    };
    let Some(toggle) = w.toggle.filter(|_| w.flags.contains(WallFlags::TOGGLE_SECTOR)) else {
        return;
    };
    if is_at(floor_z, origin_z) {
        w.tex = toggle.base_tex;
    } else if is_at(floor_z, toggled_z) {
        w.tex = toggle.active_tex.unwrap_or(toggle.base_tex);
    }
}

/// Advance every moving floor by one step of `dt` seconds.
///
/// A grounded `rider` standing in the moving sector is carried along; a move
/// that would push it into the ceiling is frozen where it is.
pub fn update_movable_floors(
    world: &mut World,
    mut rider: Option<&mut PhysicsBody>,
    dt: f32,
    body_params: &PhysicsBodyParams,
    floor_params: &FloorParams,
) {
    if dt <= 0.0 || floor_params.speed <= 1e-6 {
        return;
    }
    let step = floor_params.speed * dt;

    for i in 0..world.sectors.len() {
        let sector = &mut world.sectors[i];
        let Some(mut m) = sector.movable.filter(|m| m.moving) else {
            continue;
        };

        let old_floor = sector.floor_z;
        let diff = m.target_z - old_floor;

        if diff.abs() > AT_EPS {
            let delta = diff.clamp(-step, step);
            let new_floor = old_floor + delta;

            let riding = rider
                .as_deref_mut()
                .filter(|r| r.sector.is_some_and(|s| s as usize == i));

            if let Some(r) = riding {
                if !rider_fits(sector, r, old_floor, new_floor, delta, body_params) {
                    tracing::debug!(sector = i, z = old_floor, "floor move blocked by rider");
                    m.moving = false;
                    m.target_z = old_floor;
                    m.toggle_wall = None;
                    sector.movable = Some(m);
                    continue;
                }
                sector.floor_z = new_floor;
                if r.on_ground && (r.z - old_floor).abs() <= body_params.floor_epsilon + RIDE_SLACK {
                    r.z += delta;
                }
                if r.z < new_floor {
                    r.z = new_floor;
                }
            } else {
                sector.floor_z = new_floor;
            }
        }

        if is_at(sector.floor_z, m.target_z) {
            sector.floor_z = m.target_z;
            m.moving = false;
            let wall = m.toggle_wall.take();
            let (floor_z, origin, toggled) = (sector.floor_z, m.origin_z, m.toggled_z);
            sector.movable = Some(m);
            apply_toggle_texture(world, wall, floor_z, origin, toggled);
            tracing::debug!(sector = i, z = floor_z, "floor arrived");
        } else {
            sector.movable = Some(m);
        }
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{NO_TEXTURE, WorldBuilder};
    use glam::{Vec2, vec2};

    const DT: f32 = 1.0 / 60.0;
    const ACTIVE_TEX: u16 = 7;

    /// Single room whose floor rises to 1.0; the west wall is the switch.
    fn lift_room(ceil: f32, oneshot: bool) -> World {
        let mut b = WorldBuilder::new();
        let s = b.sector(0.0, ceil);
        b.movable_floor(s, 1.0);
        let walls = b.room(s, &[vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 4.0), vec2(0.0, 4.0)]);
        // last edge of the loop: (0,4) -> (0,0)
        b.toggle_wall(walls.end - 1, None, Some(ACTIVE_TEX), oneshot);
        b.build()
    }

    fn rider_at(world: &World, pos: Vec2) -> PhysicsBody {
        let mut body = PhysicsBody::new(pos, 0.0, 0.3, 1.8, 0.25);
        body.update(world, Vec2::ZERO, DT, &PhysicsBodyParams::default());
        body
    }

    fn run_floors(world: &mut World, rider: &mut PhysicsBody, frames: usize) {
        let bp = PhysicsBodyParams::default();
        let fp = FloorParams::default();
        for _ in 0..frames {
            update_movable_floors(world, Some(rider), DT, &bp, &fp);
        }
    }

    #[test]
    fn touching_switch_starts_move() {
        let mut world = lift_room(4.0, false);
        let body = rider_at(&world, vec2(0.32, 2.0));
        assert!(try_toggle_touching_wall(&mut world, &body));
        let m = world.sectors[0].movable.unwrap();
        assert!(m.moving);
        assert_eq!(m.target_z, 1.0);
        // global lock while something moves
        assert!(!try_toggle_touching_wall(&mut world, &body));
    }

    #[test]
    fn out_of_reach_does_nothing() {
        let mut world = lift_room(4.0, false);
        let body = rider_at(&world, vec2(2.0, 2.0));
        assert!(!try_toggle_touching_wall(&mut world, &body));
    }

    #[test]
    fn floor_carries_rider_and_swaps_texture() {
        let mut world = lift_room(4.0, false);
        let mut body = rider_at(&world, vec2(0.32, 2.0));
        assert!(try_toggle_touching_wall(&mut world, &body));

        run_floors(&mut world, &mut body, 60);

        let s = &world.sectors[0];
        assert_eq!(s.floor_z, 1.0);
        assert!(!s.movable.unwrap().moving);
        assert!((body.z - 1.0).abs() < 1e-4);
        assert_eq!(world.walls[3].tex, ACTIVE_TEX);

        // and back down again
        assert!(try_toggle_touching_wall(&mut world, &body));
        run_floors(&mut world, &mut body, 60);
        assert_eq!(world.sectors[0].floor_z, 0.0);
        assert_eq!(world.walls[3].tex, NO_TEXTURE);
    }

    #[test]
    fn oneshot_refuses_second_use() {
        let mut world = lift_room(4.0, true);
        let mut body = rider_at(&world, vec2(0.32, 2.0));
        assert!(try_toggle_touching_wall(&mut world, &body));
        run_floors(&mut world, &mut body, 60);
        assert!(!try_toggle_touching_wall(&mut world, &body));
    }

    #[test]
    fn crushing_move_is_frozen() {
        // 2.5 - 0.08 - 1.8 = 0.62: the floor may not pass that with a rider
        let mut world = lift_room(2.5, false);
        let mut body = rider_at(&world, vec2(0.32, 2.0));
        assert!(try_toggle_touching_wall(&mut world, &body));
        run_floors(&mut world, &mut body, 60);

        let s = &world.sectors[0];
        let m = s.movable.unwrap();
        assert!(!m.moving);
        assert!(s.floor_z <= 0.62 + 1e-4);
        assert!(body.z + body.height <= s.ceil_z - 0.08 + 1e-4);
    }
}
