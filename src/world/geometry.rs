use bitflags::bitflags;
use glam::Vec2;
use thiserror::Error;

use crate::world::light::{LightColor, PointLight};
use crate::world::texture::TextureId;

pub type VertexId = u16;
pub type WallId = u16;
pub type SectorId = u16;

/// Minimum vertical clearance a sector must have between floor and ceiling.
pub const MIN_SECTOR_HEADROOM: f32 = 1e-3;

/// Runtime snapshot of one level. Geometry is immutable after load; only the
/// wall flags, wall textures and movable-floor state change between ticks.
#[derive(Clone, Debug, Default)]
pub struct World {
    pub vertices: Vec<Vertex>,
    pub walls: Vec<Wall>,
    pub sectors: Vec<Sector>,
    pub lights: Vec<PointLight>,
    pub player_start: Option<PlayerStart>,
}

/*----------------------- simple primitives --------------------------*/

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub pos: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerStart {
    pub pos: Vec2,
    pub angle_deg: f32,
}

/*------------------------------ walls -------------------------------*/

bitflags! {
    /// Mutable runtime state carried by a wall.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct WallFlags: u8 {
        /// A closed door: the portal behaves like a solid wall.
        const DOOR_BLOCKED   = 0x01;
        /// Touching this wall toggles a movable floor.
        const TOGGLE_SECTOR  = 0x02;
        /// The toggle fires once and then stays at the toggled height.
        const TOGGLE_ONESHOT = 0x04;
    }
}

/// Binding from a switch wall to the movable floor it drives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectorToggle {
    /// Authored sector id; `None` means "the sector the toucher stands in".
    pub sector_id: Option<i32>,
    pub base_tex: TextureId,
    pub active_tex: Option<TextureId>,
}

/// Directed edge. Points with a non-negative cross product of
/// `(v1 - v0) × (p - v0)` are on the *front* side.
#[derive(Clone, Debug, PartialEq)]
pub struct Wall {
    pub v0: VertexId,
    pub v1: VertexId,
    pub front_sector: SectorId,
    /// `None` for a solid wall, `Some` for a portal.
    pub back_sector: Option<SectorId>,
    pub tex: TextureId,
    pub flags: WallFlags,
    pub toggle: Option<SectorToggle>,
}

impl Wall {
    #[inline]
    pub fn is_portal(&self) -> bool {
        self.back_sector.is_some()
    }

    #[inline]
    pub fn door_blocked(&self) -> bool {
        self.flags.contains(WallFlags::DOOR_BLOCKED)
    }

    #[inline]
    pub fn borders(&self, sector: SectorId) -> bool {
        self.front_sector == sector || self.back_sector == Some(sector)
    }

    /// Sector on the far side when coming from `from`.
    #[inline]
    pub fn other_sector(&self, from: SectorId) -> Option<SectorId> {
        if from == self.front_sector {
            self.back_sector
        } else {
            Some(self.front_sector)
        }
    }
}

/*----------------------------- sectors ------------------------------*/

/// Sub-state of a sector whose floor can be toggled between two heights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovableFloor {
    pub origin_z: f32,
    pub toggled_z: f32,
    pub target_z: f32,
    pub moving: bool,
    /// Wall whose texture follows the floor state once the move ends.
    pub toggle_wall: Option<WallId>,
}

impl MovableFloor {
    pub fn new(origin_z: f32, toggled_z: f32) -> Self {
        Self {
            origin_z,
            toggled_z,
            target_z: origin_z,
            moving: false,
            toggle_wall: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sector {
    /// Authored id, referenced by toggle walls. Not the index.
    pub id: i32,
    pub floor_z: f32,
    pub ceil_z: f32,
    pub floor_tex: TextureId,
    pub ceil_tex: TextureId,
    pub light: f32,
    pub tint: LightColor,
    pub movable: Option<MovableFloor>,
}

impl Sector {
    #[inline]
    pub fn height(&self) -> f32 {
        self.ceil_z - self.floor_z
    }
}

/*--------------------------- validation -----------------------------*/

/// Problems `World::validate` reports to the level loader.
#[derive(Debug, Error, PartialEq)]
pub enum LevelError {
    #[error("level has no sectors")]
    NoSectors,

    #[error("wall {wall} references vertex {vertex} (only {count} vertices)")]
    BadVertex {
        wall: usize,
        vertex: VertexId,
        count: usize,
    },

    #[error("wall {0} starts and ends at the same vertex")]
    DegenerateWall(usize),

    #[error("wall {wall} references sector {sector} (only {count} sectors)")]
    BadSector {
        wall: usize,
        sector: SectorId,
        count: usize,
    },

    #[error("sector {index} has ceiling {ceil_z} not above floor {floor_z}")]
    NoHeadroom {
        index: usize,
        floor_z: f32,
        ceil_z: f32,
    },
}

impl World {
    /// Bounds-checked sector lookup.
    #[inline]
    pub fn sector(&self, id: SectorId) -> Option<&Sector> {
        self.sectors.get(id as usize)
    }

    #[inline]
    pub fn sector_mut(&mut self, id: SectorId) -> Option<&mut Sector> {
        self.sectors.get_mut(id as usize)
    }

    #[inline]
    pub fn is_valid_sector(&self, id: Option<SectorId>) -> bool {
        id.is_some_and(|s| (s as usize) < self.sectors.len())
    }

    /// Both endpoints of `wall`, or `None` if either index is out of range.
    #[inline]
    pub fn wall_segment(&self, wall: &Wall) -> Option<(Vec2, Vec2)> {
        let a = self.vertices.get(wall.v0 as usize)?;
        let b = self.vertices.get(wall.v1 as usize)?;
        Some((a.pos, b.pos))
    }

    /// Index of the sector whose authored id is `id`.
    pub fn sector_index_by_id(&self, id: i32) -> Option<SectorId> {
        self.sectors
            .iter()
            .position(|s| s.id == id)
            .map(|i| i as SectorId)
    }

    /// The opposite-directed portal edge between the same two sectors.
    pub fn find_twin_wall(&self, wall: WallId) -> Option<WallId> {
        let w = self.walls.get(wall as usize)?;
        let back = w.back_sector?;
        self.walls
            .iter()
            .enumerate()
            .find(|&(i, o)| {
                i != wall as usize
                    && o.v0 == w.v1
                    && o.v1 == w.v0
                    && o.front_sector == back
                    && o.back_sector == Some(w.front_sector)
            })
            .map(|(i, _)| i as WallId)
    }

    /// Door hook: open or close a portal (and its twin).
    pub fn set_door_blocked(&mut self, wall: WallId, blocked: bool) {
        let twin = self.find_twin_wall(wall);
        for id in std::iter::once(wall).chain(twin) {
            if let Some(w) = self.walls.get_mut(id as usize) {
                w.flags.set(WallFlags::DOOR_BLOCKED, blocked);
            }
        }
    }

    /// Upstream validation for the level loader. The runtime never relies on
    /// it: every query skips bad references on its own.
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.sectors.is_empty() {
            return Err(LevelError::NoSectors);
        }
        let vcount = self.vertices.len();
        let scount = self.sectors.len();

        for (i, w) in self.walls.iter().enumerate() {
            for v in [w.v0, w.v1] {
                if v as usize >= vcount {
                    return Err(LevelError::BadVertex {
                        wall: i,
                        vertex: v,
                        count: vcount,
                    });
                }
            }
            if w.v0 == w.v1 {
                return Err(LevelError::DegenerateWall(i));
            }
            for s in std::iter::once(w.front_sector).chain(w.back_sector) {
                if s as usize >= scount {
                    return Err(LevelError::BadSector {
                        wall: i,
                        sector: s,
                        count: scount,
                    });
                }
            }
        }

        for (i, s) in self.sectors.iter().enumerate() {
            if s.ceil_z <= s.floor_z + MIN_SECTOR_HEADROOM {
                return Err(LevelError::NoHeadroom {
                    index: i,
                    floor_z: s.floor_z,
                    ceil_z: s.ceil_z,
                });
            }
        }

        tracing::debug!(
            vertices = vcount,
            walls = self.walls.len(),
            sectors = scount,
            "level validated"
        );
        Ok(())
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
