//! Programmatic level assembly.
//!
//! The real level loader lives outside this crate; it (and the tests, and the
//! demo viewer) feed geometry through [`WorldBuilder`] so that shared edges
//! become proper twin portals.

use glam::Vec2;

use crate::world::geometry::{
    MovableFloor, PlayerStart, Sector, SectorId, SectorToggle, Vertex, VertexId, Wall, WallFlags,
    WallId, World,
};
use crate::world::light::{LightColor, PointLight};
use crate::world::texture::{NO_TEXTURE, TextureId};

#[derive(Default)]
pub struct WorldBuilder {
    world: World,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sector with untextured, fully lit surfaces. Its authored id is
    /// its index.
    pub fn sector(&mut self, floor_z: f32, ceil_z: f32) -> SectorId {
        let id = self.world.sectors.len();
        self.world.sectors.push(Sector {
            id: id as i32,
            floor_z,
            ceil_z,
            floor_tex: NO_TEXTURE,
            ceil_tex: NO_TEXTURE,
            light: 1.0,
            tint: LightColor::WHITE,
            movable: None,
        });
        id as SectorId
    }

    pub fn sector_textures(&mut self, s: SectorId, floor: TextureId, ceil: TextureId) -> &mut Self {
        if let Some(sec) = self.world.sector_mut(s) {
            sec.floor_tex = floor;
            sec.ceil_tex = ceil;
        }
        self
    }

    pub fn sector_light(&mut self, s: SectorId, light: f32, tint: LightColor) -> &mut Self {
        if let Some(sec) = self.world.sector_mut(s) {
            sec.light = light;
            sec.tint = tint;
        }
        self
    }

    /// Make the floor of `s` toggle between its current height and `toggled_z`.
    pub fn movable_floor(&mut self, s: SectorId, toggled_z: f32) -> &mut Self {
        if let Some(sec) = self.world.sector_mut(s) {
            sec.movable = Some(MovableFloor::new(sec.floor_z, toggled_z));
        }
        self
    }

    /// Vertex at `pos`, reusing an existing one at the exact same spot.
    pub fn vertex(&mut self, pos: Vec2) -> VertexId {
        if let Some(i) = self.world.vertices.iter().position(|v| v.pos == pos) {
            return i as VertexId;
        }
        self.world.vertices.push(Vertex { pos });
        (self.world.vertices.len() - 1) as VertexId
    }

    /// Raw wall between two existing vertices.
    pub fn wall(
        &mut self,
        v0: VertexId,
        v1: VertexId,
        front: SectorId,
        back: Option<SectorId>,
        tex: TextureId,
    ) -> WallId {
        self.world.walls.push(Wall {
            v0,
            v1,
            front_sector: front,
            back_sector: back,
            tex,
            flags: WallFlags::empty(),
            toggle: None,
        });
        (self.world.walls.len() - 1) as WallId
    }

    /// Closed counter-clockwise loop of solid walls owned by `s`.
    pub fn room(&mut self, s: SectorId, points: &[Vec2]) -> std::ops::Range<WallId> {
        self.room_textured(s, points, NO_TEXTURE)
    }

    pub fn room_textured(
        &mut self,
        s: SectorId,
        points: &[Vec2],
        tex: TextureId,
    ) -> std::ops::Range<WallId> {
        let first = self.world.walls.len() as WallId;
        let ids: Vec<VertexId> = points.iter().map(|&p| self.vertex(p)).collect();
        for (i, &v0) in ids.iter().enumerate() {
            let v1 = ids[(i + 1) % ids.len()];
            self.wall(v0, v1, s, None, tex);
        }
        first..self.world.walls.len() as WallId
    }

    /// Turn every pair of opposite-directed walls owned by different sectors
    /// into twin portals.
    pub fn link_portals(&mut self) -> &mut Self {
        let n = self.world.walls.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let (a, b) = (&self.world.walls[i], &self.world.walls[j]);
                if a.v0 == b.v1 && a.v1 == b.v0 && a.front_sector != b.front_sector {
                    let back = b.front_sector;
                    self.world.walls[i].back_sector = Some(back);
                }
            }
        }
        self
    }

    pub fn wall_texture(&mut self, wall: WallId, tex: TextureId) -> &mut Self {
        if let Some(w) = self.world.walls.get_mut(wall as usize) {
            w.tex = tex;
        }
        self
    }

    /// Bind a switch wall to a movable floor.
    pub fn toggle_wall(
        &mut self,
        wall: WallId,
        sector_id: Option<i32>,
        active_tex: Option<TextureId>,
        oneshot: bool,
    ) -> &mut Self {
        if let Some(w) = self.world.walls.get_mut(wall as usize) {
            w.flags.insert(WallFlags::TOGGLE_SECTOR);
            w.flags.set(WallFlags::TOGGLE_ONESHOT, oneshot);
            w.toggle = Some(SectorToggle {
                sector_id,
                base_tex: w.tex,
                active_tex,
            });
        }
        self
    }

    pub fn light(&mut self, light: PointLight) -> &mut Self {
        self.world.lights.push(light);
        self
    }

    pub fn player_start(&mut self, pos: Vec2, angle_deg: f32) -> &mut Self {
        self.world.player_start = Some(PlayerStart { pos, angle_deg });
        self
    }

    pub fn build(self) -> World {
        self.world
    }
}
