use glam::Vec2;

use crate::world::geometry::{SectorId, Wall, World};

/// Segments shorter than this (squared) are treated as points.
const DEGENERATE_LEN2: f32 = 1e-8;

// ──────────────────────────────────────────────────────────────────────────
//                       Segment math (pure)
// ──────────────────────────────────────────────────────────────────────────

/// Parameter of the projection of `p` onto `a → b`, clamped to `[0, 1]`.
#[inline]
pub fn segment_param(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= DEGENERATE_LEN2 {
        return 0.0;
    }
    ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
}

#[inline]
pub fn closest_point_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    a + (b - a) * segment_param(a, b, p)
}

/// Where `p0 → p1` crosses `q0 → q1`, as a parameter along `p`.
///
/// Touching at the start of `p` does not count; a crossing exactly at the
/// end of `p` does.
pub fn segment_intersect_param(p0: Vec2, p1: Vec2, q0: Vec2, q1: Vec2) -> Option<f32> {
    let r = p1 - p0;
    let s = q1 - q0;
    let denom = r.perp_dot(s);
    if denom.abs() < 1e-8 {
        return None;
    }
    let qp = q0 - p0;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    (t > 1e-6 && t <= 1.0 + 1e-6 && u >= -1e-6 && u <= 1.0 + 1e-6).then_some(t)
}

/// Distance along the ray `origin + t·dir` to segment `a → b`.
#[inline]
pub fn ray_segment_hit(origin: Vec2, dir: Vec2, a: Vec2, b: Vec2) -> Option<f32> {
    let s = b - a;
    let denom = dir.perp_dot(s);
    if denom.abs() < 1e-6 {
        return None;
    }
    let ao = a - origin;
    let t = ao.perp_dot(s) / denom;
    let u = ao.perp_dot(dir) / denom;
    (t >= 0.0 && (0.0..=1.0).contains(&u)).then_some(t)
}

/// Signed side of `p` relative to the directed edge `a → b`.
#[inline]
pub fn side_of(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

// ──────────────────────────────────────────────────────────────────────────
//                       World – spatial queries
// ──────────────────────────────────────────────────────────────────────────
impl World {
    /// Even-odd test against the walls that bound `sector`.
    ///
    /// Only front-owned edges are used so that portals authored as two
    /// opposing walls are not counted twice. Sectors with no front-owned
    /// edge fall back to every edge that references them.
    pub fn point_in_sector(&self, sector: SectorId, p: Vec2) -> bool {
        if sector as usize >= self.sectors.len() {
            return false;
        }

        let mut inside = false;
        let mut any_front = false;
        for w in self.walls.iter().filter(|w| w.front_sector == sector) {
            any_front = true;
            if self.edge_crosses_ray(w, p) {
                inside = !inside;
            }
        }
        if any_front {
            return inside;
        }

        for w in self.walls.iter().filter(|w| w.borders(sector)) {
            if self.edge_crosses_ray(w, p) {
                inside = !inside;
            }
        }
        inside
    }

    /// Does the horizontal ray from `p` towards +X cross `w`?
    #[inline]
    fn edge_crosses_ray(&self, w: &Wall, p: Vec2) -> bool {
        let Some((a, b)) = self.wall_segment(w) else {
            return false;
        };
        let dy = b.y - a.y;
        if dy.abs() < 1e-12 {
            return false;
        }
        if (a.y > p.y) == (b.y > p.y) {
            return false;
        }
        let x = a.x + (p.y - a.y) * (b.x - a.x) / dy;
        p.x < x
    }

    /// First sector (by index) containing `p`.
    pub fn find_sector_at_point(&self, p: Vec2) -> Option<SectorId> {
        (0..self.sectors.len())
            .map(|i| i as SectorId)
            .find(|&s| self.point_in_sector(s, p))
    }

    /// Like [`World::find_sector_at_point`], but falls back to `last_valid`
    /// when `p` is in no sector (boundary jitter).
    pub fn find_sector_at_point_stable(
        &self,
        p: Vec2,
        last_valid: Option<SectorId>,
    ) -> Option<SectorId> {
        self.find_sector_at_point(p)
            .or(last_valid.filter(|&s| (s as usize) < self.sectors.len()))
    }

    /// Sector on `p`'s side of `wall`; the other side if that one is invalid.
    pub fn wall_sector_for_point(&self, wall: &Wall, p: Vec2) -> Option<SectorId> {
        let valid = |s: Option<SectorId>| s.filter(|&s| (s as usize) < self.sectors.len());
        let Some((a, b)) = self.wall_segment(wall) else {
            return valid(Some(wall.front_sector));
        };
        let (near, far) = if side_of(a, b, p) >= 0.0 {
            (Some(wall.front_sector), wall.back_sector)
        } else {
            (wall.back_sector, Some(wall.front_sector))
        };
        valid(near).or(valid(far))
    }

    /// Blocks sight and rays: solid, a closed door, or a portal to nowhere.
    #[inline]
    pub fn wall_is_opaque(&self, wall: &Wall) -> bool {
        match wall.back_sector {
            None => true,
            Some(back) => wall.door_blocked() || self.sector(back).is_none(),
        }
    }

    /// True unless `from → to` properly crosses an opaque wall. Grazing a
    /// wall endpoint does not block.
    pub fn line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let r = to - from;
        if r.length_squared() <= 1e-10 {
            return true;
        }
        const EPS: f32 = 1e-4;
        for w in self.walls.iter().filter(|w| self.wall_is_opaque(w)) {
            let Some((a, b)) = self.wall_segment(w) else {
                continue;
            };
            let s = b - a;
            let denom = r.perp_dot(s);
            if denom.abs() <= 1e-10 {
                continue;
            }
            let qp = a - from;
            let t = qp.perp_dot(s) / denom;
            let u = qp.perp_dot(r) / denom;
            if t > EPS && t < 1.0 - EPS && u > EPS && u < 1.0 - EPS {
                return false;
            }
        }
        true
    }
}

/// Per-caller sticky sector lookup. Each query context owns one; there is
/// no shared memo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectorTracker {
    last: Option<SectorId>,
}

impl SectorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn last(&self) -> Option<SectorId> {
        self.last
    }

    /// Resolve `p`, remembering the result for the next miss.
    pub fn locate(&mut self, world: &World, p: Vec2) -> Option<SectorId> {
        let s = world.find_sector_at_point_stable(p, self.last);
        if s.is_some() {
            self.last = s;
        }
        s
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
