use glam::Vec2;
use smallvec::SmallVec;

use crate::world::{SectorId, WallId, World};

/// Render-side copy of the level geometry, built once per level.
///
/// Only positions and adjacency live here; flags, heights and textures are
/// read from the [`World`] every frame so doors and floors stay live.
#[derive(Clone, Debug, Default)]
pub struct LevelMesh {
    /// Resolved endpoints per wall; `None` for walls with bad vertex ids.
    segments: Vec<Option<(Vec2, Vec2)>>,
    /// Opposite-directed portal partner per wall.
    twins: Vec<Option<WallId>>,
    /// Every wall touching a sector, on either side.
    sector_walls: Vec<SmallVec<[WallId; 8]>>,
}

impl LevelMesh {
    pub fn build(world: &World) -> Self {
        let segments: Vec<_> = world.walls.iter().map(|w| world.wall_segment(w)).collect();
        let twins = (0..world.walls.len())
            .map(|i| world.find_twin_wall(i as WallId))
            .collect();

        let mut sector_walls = vec![SmallVec::new(); world.sectors.len()];
        for (i, w) in world.walls.iter().enumerate() {
            if segments[i].is_none() {
                continue;
            }
            for s in std::iter::once(w.front_sector).chain(w.back_sector) {
                if let Some(list) = sector_walls.get_mut(s as usize) {
                    list.push(i as WallId);
                }
            }
        }

        tracing::debug!(
            walls = segments.len(),
            sectors = sector_walls.len(),
            "level mesh built"
        );
        Self {
            segments,
            twins,
            sector_walls,
        }
    }

    #[inline]
    pub fn wall_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn segment(&self, wall: WallId) -> Option<(Vec2, Vec2)> {
        self.segments.get(wall as usize).copied().flatten()
    }

    #[inline]
    pub fn twin(&self, wall: WallId) -> Option<WallId> {
        self.twins.get(wall as usize).copied().flatten()
    }

    /// Walls bordering `sector`; empty for unknown sectors.
    #[inline]
    pub fn sector_walls(&self, sector: SectorId) -> &[WallId] {
        self.sector_walls
            .get(sector as usize)
            .map_or(&[], |v| v.as_slice())
    }

    /// Does the mesh still describe `world`'s wall list?
    #[inline]
    pub fn matches(&self, world: &World) -> bool {
        self.segments.len() == world.walls.len() && self.sector_walls.len() == world.sectors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldBuilder;
    use glam::vec2;

    #[test]
    fn portal_walls_are_listed_for_both_sectors() {
        let mut b = WorldBuilder::new();
        let a = b.sector(0.0, 3.0);
        let c = b.sector(0.0, 3.0);
        b.room(a, &[vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 4.0), vec2(0.0, 4.0)]);
        b.room(c, &[vec2(4.0, 0.0), vec2(8.0, 0.0), vec2(8.0, 4.0), vec2(4.0, 4.0)]);
        b.link_portals();
        let world = b.build();
        let mesh = LevelMesh::build(&world);

        assert!(mesh.matches(&world));
        assert_eq!(mesh.wall_count(), 8);
        // 4 own walls + the neighbour's half of the portal
        assert_eq!(mesh.sector_walls(a).len(), 5);
        assert_eq!(mesh.sector_walls(c).len(), 5);
        assert!(mesh.sector_walls(99).is_empty());

        let portal = world.walls.iter().position(|w| w.is_portal()).unwrap() as WallId;
        let twin = mesh.twin(portal).unwrap();
        assert_eq!(mesh.twin(twin), Some(portal));
        assert_eq!(mesh.segment(portal).map(|(a, b)| (b, a)), mesh.segment(twin));
    }
}
