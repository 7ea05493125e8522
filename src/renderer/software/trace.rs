//! Per-column ray traces: nearest opaque wall along a ray.

use glam::Vec2;
use smallvec::SmallVec;

use super::{LevelMesh, RenderStats};
use crate::world::{SectorId, WallId, World, ray_segment_hit};

/// Deepest chain of portals one column may walk through.
pub const MAX_PORTAL_DEPTH: usize = 64;
/// Hard cap on walk iterations, whatever the level looks like.
const WALK_GUARD: usize = 1024;
/// Hits this far before the entry point still count.
const T_EPS: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallHit {
    pub wall: WallId,
    /// Ray parameter (unit direction, so a distance).
    pub t: f32,
    /// Sector the ray was in when it hit.
    pub sector: Option<SectorId>,
}

/// One sector the ray passed through and where it left it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathEntry {
    pub sector: SectorId,
    pub t_exit: f32,
}

pub type TracePath = SmallVec<[PathEntry; MAX_PORTAL_DEPTH]>;

/// Test every opaque wall; nearest wins, lower index on ties.
pub fn flat_scan(
    world: &World,
    mesh: &LevelMesh,
    origin: Vec2,
    dir: Vec2,
    stats: &mut RenderStats,
) -> Option<WallHit> {
    let mut best: Option<(f32, WallId)> = None;
    for (i, w) in world.walls.iter().enumerate() {
        if !world.wall_is_opaque(w) {
            continue;
        }
        let Some((a, b)) = mesh.segment(i as WallId) else {
            continue;
        };
        stats.walls_tested += 1;
        if let Some(t) = ray_segment_hit(origin, dir, a, b)
            && best.is_none_or(|(bt, _)| t < bt)
        {
            best = Some((t, i as WallId));
        }
    }

    best.map(|(t, wall)| {
        let sector = world
            .walls
            .get(wall as usize)
            .and_then(|w| world.wall_sector_for_point(w, origin));
        WallHit { wall, t, sector }
    })
}

/// Walk from `start` through passable portals until an opaque wall.
///
/// `path` receives every sector visited with the distance at which the ray
/// left it; the last entry is the hit sector.
pub fn portal_walk(
    world: &World,
    mesh: &LevelMesh,
    origin: Vec2,
    dir: Vec2,
    start: SectorId,
    path: &mut TracePath,
    stats: &mut RenderStats,
) -> Option<WallHit> {
    path.clear();
    path.push(PathEntry {
        sector: start,
        t_exit: f32::INFINITY,
    });

    let mut sector = start;
    let mut t_min = 0.0f32;
    let mut entered: Option<(WallId, Option<WallId>)> = None;

    for _ in 0..WALK_GUARD {
        /* ----- nearest boundary of the current sector ahead of us ------- */
        let mut best: Option<(f32, WallId)> = None;
        for &w in mesh.sector_walls(sector) {
            if entered.is_some_and(|(e, twin)| w == e || Some(w) == twin) {
                continue;
            }
            let Some((a, b)) = mesh.segment(w) else {
                continue;
            };
            stats.walls_tested += 1;
            let Some(t) = ray_segment_hit(origin, dir, a, b) else {
                continue;
            };
            if t + T_EPS < t_min {
                continue;
            }
            if best.is_none_or(|(bt, bw)| t < bt || (t == bt && w < bw)) {
                best = Some((t, w));
            }
        }

        let (t, w) = best?;
        if let Some(last) = path.last_mut() {
            last.t_exit = t;
        }
        let Some(wall) = world.walls.get(w as usize) else {
            return None;
        };

        if world.wall_is_opaque(wall) {
            return Some(WallHit {
                wall: w,
                t,
                sector: Some(sector),
            });
        }

        /* ----- step through the portal ---------------------------------- */
        let Some(next) = wall.other_sector(sector).filter(|&s| world.sector(s).is_some()) else {
            return Some(WallHit {
                wall: w,
                t,
                sector: Some(sector),
            });
        };
        if path.len() >= MAX_PORTAL_DEPTH {
            tracing::trace!(wall = w, "portal depth limit");
            return Some(WallHit {
                wall: w,
                t,
                sector: Some(sector),
            });
        }

        path.push(PathEntry {
            sector: next,
            t_exit: f32::INFINITY,
        });
        stats.max_portal_depth = stats.max_portal_depth.max(path.len() - 1);
        sector = next;
        t_min = t;
        entered = Some((w, mesh.twin(w)));
    }

    tracing::trace!(start, "portal walk guard tripped");
    None
}

/// Sector the ray occupies at distance `t` along a traced path.
#[inline]
pub fn sector_at(path: &[PathEntry], t: f32) -> Option<SectorId> {
    path.iter()
        .find(|e| t <= e.t_exit)
        .or(path.last())
        .map(|e| e.sector)
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldBuilder;
    use glam::vec2;

    /// Three rooms in a row along +X, 4 units each.
    fn corridor() -> World {
        let mut b = WorldBuilder::new();
        for i in 0..3 {
            let s = b.sector(0.0, 3.0);
            let x = i as f32 * 4.0;
            b.room(s, &[vec2(x, 0.0), vec2(x + 4.0, 0.0), vec2(x + 4.0, 4.0), vec2(x, 4.0)]);
        }
        b.link_portals();
        b.build()
    }

    #[test]
    fn walk_passes_portals_and_records_path() {
        let world = corridor();
        let mesh = LevelMesh::build(&world);
        let mut path = TracePath::new();
        let mut stats = RenderStats::default();

        let hit = portal_walk(&world, &mesh, vec2(1.0, 2.0), Vec2::X, 0, &mut path, &mut stats).unwrap();
        assert!((hit.t - 11.0).abs() < 1e-5);
        assert_eq!(hit.sector, Some(2));
        assert_eq!(path.len(), 3);
        assert_eq!(stats.max_portal_depth, 2);

        assert_eq!(sector_at(&path, 2.0), Some(0));
        assert_eq!(sector_at(&path, 5.0), Some(1));
        assert_eq!(sector_at(&path, 10.0), Some(2));
        assert_eq!(sector_at(&path, 99.0), Some(2));
    }

    #[test]
    fn closed_door_stops_the_walk() {
        let mut world = corridor();
        let door = world
            .walls
            .iter()
            .position(|w| w.front_sector == 1 && w.back_sector == Some(2))
            .unwrap() as WallId;
        world.set_door_blocked(door, true);
        let mesh = LevelMesh::build(&world);
        let mut path = TracePath::new();
        let mut stats = RenderStats::default();

        let hit = portal_walk(&world, &mesh, vec2(1.0, 2.0), Vec2::X, 0, &mut path, &mut stats).unwrap();
        assert!((hit.t - 7.0).abs() < 1e-5);
        assert_eq!(hit.sector, Some(1));

        let flat = flat_scan(&world, &mesh, vec2(1.0, 2.0), Vec2::X, &mut stats).unwrap();
        assert!((flat.t - 7.0).abs() < 1e-5);
    }

    #[test]
    fn flat_scan_ignores_open_portals() {
        let world = corridor();
        let mesh = LevelMesh::build(&world);
        let mut stats = RenderStats::default();
        let hit = flat_scan(&world, &mesh, vec2(1.0, 2.0), Vec2::X, &mut stats).unwrap();
        assert!((hit.t - 11.0).abs() < 1e-5);
        assert_eq!(hit.sector, Some(2));
        assert!(stats.walls_tested > 0);
    }

    #[test]
    fn open_edge_of_the_world_yields_nothing() {
        let mut b = WorldBuilder::new();
        let s = b.sector(0.0, 3.0);
        // three sides only, the east side is open
        let v = [vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 4.0), vec2(0.0, 4.0)].map(|p| b.vertex(p));
        b.wall(v[2], v[3], s, None, 0);
        b.wall(v[3], v[0], s, None, 0);
        b.wall(v[0], v[1], s, None, 0);
        let world = b.build();
        let mesh = LevelMesh::build(&world);
        let mut path = TracePath::new();
        let mut stats = RenderStats::default();
        assert_eq!(
            portal_walk(&world, &mesh, vec2(1.0, 2.0), Vec2::X, 0, &mut path, &mut stats),
            None
        );
    }
}
