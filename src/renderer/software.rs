//! ---------------------------------------------------------------------------
//! Per-column software raycaster
//!
//! * Fills a [`Framebuffer`] in **0xAABBGGRR** format, one screen column at a
//!   time: nearest opaque wall, then floor/ceiling rows above and below it.
//! * Records the corrected wall distance per column and (optionally) the
//!   distance of every written pixel, for sprite/particle occlusion.
//! * All scratch is owned by [`Raycaster`] and only reallocated when the
//!   resolution changes.
//! ---------------------------------------------------------------------------

mod mesh;
mod trace;

use std::ops::Range;

use glam::Vec2;

pub use mesh::LevelMesh;
pub use trace::{MAX_PORTAL_DEPTH, PathEntry, WallHit};

use crate::renderer::{DepthBuffer, Framebuffer, Renderer, Rgba, Scene, abgr};
use crate::world::{LightColor, SectorId, segment_param};
use trace::TracePath;

/// How a column finds its nearest opaque wall.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceMode {
    /// Walk sector to sector through open portals.
    #[default]
    PortalWalk,
    /// Test every opaque wall in the level.
    FlatScan,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    pub trace_mode: TraceMode,
    pub write_pixel_depth: bool,
    pub clear_color: Rgba,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            trace_mode: TraceMode::PortalWalk,
            write_pixel_depth: true,
            clear_color: abgr(0x0B, 0x0E, 0x14, 0xFF),
        }
    }
}

/// Profiling counters, reset every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub columns_hit: usize,
    pub walls_tested: usize,
    pub max_portal_depth: usize,
}

/*───────────────────────────────────────────────────────────────────────*/
/*                              Backend                                 */
/*───────────────────────────────────────────────────────────────────────*/

pub struct Raycaster {
    config: RenderConfig,
    width: usize,
    height: usize,
    wall_depth: Vec<f32>,
    pixel_depth: DepthBuffer,
    path: TracePath,
    stats: RenderStats,
}

/// Per-frame constants shared by every column.
struct Frame<'s, 'a> {
    scene: &'s Scene<'a>,
    origin: Vec2,
    view_rad: f32,
    half_h: f32,
    cam_sector: Option<SectorId>,
}

/// One column's ray.
#[derive(Clone, Copy)]
struct ColumnRay {
    x: usize,
    dir: Vec2,
    /// cos(ray − view), clamped away from zero.
    corr: f32,
}

impl Raycaster {
    pub fn new(width: usize, height: usize, config: RenderConfig) -> Self {
        let mut rc = Self {
            config,
            width: 0,
            height: 0,
            wall_depth: Vec::new(),
            pixel_depth: DepthBuffer::default(),
            path: TracePath::new(),
            stats: RenderStats::default(),
        };
        rc.begin_frame(width, height);
        rc
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
    }

    /// Corrected distance of the wall in each column; `INFINITY` for none.
    #[inline]
    pub fn wall_depth(&self) -> &[f32] {
        &self.wall_depth
    }

    #[inline]
    pub fn pixel_depth(&self) -> &DepthBuffer {
        &self.pixel_depth
    }

    #[inline]
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /*──────────────────────── column rendering ───────────────────────────*/

    fn draw_column(&mut self, fb: &mut Framebuffer, frame: &Frame<'_, '_>, ray: ColumnRay) {
        let scene = frame.scene;
        let (world, mesh) = (scene.world, scene.mesh);

        /* ----- 1. nearest opaque wall ------------------------------------ */
        let (hit, walked) = match (self.config.trace_mode, frame.cam_sector) {
            (TraceMode::PortalWalk, Some(start)) => {
                let hit = trace::portal_walk(
                    world,
                    mesh,
                    frame.origin,
                    ray.dir,
                    start,
                    &mut self.path,
                    &mut self.stats,
                );
                (hit, true)
            }
            _ => {
                self.path.clear();
                let hit = trace::flat_scan(world, mesh, frame.origin, ray.dir, &mut self.stats);
                (hit, false)
            }
        };
        let path: &[PathEntry] = if walked { &self.path } else { &[] };
        let depth = self.config.write_pixel_depth.then_some(&mut self.pixel_depth);

        let h = fb.height as i32;
        let Some(hit) = hit else {
            /* ----- no wall: planes for the whole column -------------------- */
            self.wall_depth[ray.x] = f32::INFINITY;
            let split = frame.half_h.ceil() as i32;
            let mut depth = depth;
            shade_plane_rows(fb, depth.as_deref_mut(), frame, ray, path, 0..split, false);
            shade_plane_rows(fb, depth, frame, ray, path, split..h, true);
            return;
        };

        self.stats.columns_hit += 1;
        let dist = hit.t * ray.corr;
        self.wall_depth[ray.x] = dist;

        /* ----- 2. slice extents ------------------------------------------ */
        let slice = ((fb.height as f32 / (dist + 0.001)) as i64).min(4 * fb.height as i64) as i32;
        let y0 = (h - slice) / 2;
        let y1 = y0 + slice;
        let (y0c, y1c) = (y0.max(0), y1.min(h));

        /* ----- 3. textured, lit wall ------------------------------------- */
        let mut depth = depth;
        if let (Some(wall), Some((a, b))) = (world.walls.get(hit.wall as usize), mesh.segment(hit.wall)) {
            let p = frame.origin + ray.dir * hit.t;
            let u = segment_param(a, b, p);
            let tex = scene.textures.texture_or_missing(wall.tex);
            let (light, tint) = sector_light(scene, hit.sector);

            for y in y0c..y1c {
                let v = (y - y0) as f32 / slice.max(1) as f32;
                let base = tex.sample_nearest(u, v);
                let c = scene.lighting.apply(base, dist, light, tint, &world.lights, p);
                let idx = y as usize * fb.width + ray.x;
                fb.pixels[idx] = c;
                if let Some(d) = depth.as_deref_mut() {
                    d.depth[idx] = dist;
                }
            }
        }

        /* ----- 4. ceiling above, floor below ----------------------------- */
        shade_plane_rows(fb, depth.as_deref_mut(), frame, ray, path, 0..y0c, false);
        shade_plane_rows(fb, depth, frame, ray, path, y1c..h, true);
    }
}

/// Light level and tint of `sector`; full white light when unknown.
#[inline]
fn sector_light(scene: &Scene<'_>, sector: Option<SectorId>) -> (f32, LightColor) {
    sector
        .and_then(|s| scene.world.sector(s))
        .map_or((1.0, LightColor::WHITE), |s| (s.light, s.tint))
}

/// Plane-cast `rows` of one column as floor (`true`) or ceiling.
fn shade_plane_rows(
    fb: &mut Framebuffer,
    mut depth: Option<&mut DepthBuffer>,
    frame: &Frame<'_, '_>,
    ray: ColumnRay,
    path: &[PathEntry],
    rows: Range<i32>,
    floor: bool,
) {
    let scene = frame.scene;
    let world = scene.world;

    for y in rows {
        let yc = y as f32 + 0.5;
        let offset = if floor {
            yc - frame.half_h
        } else {
            frame.half_h - yc
        };
        if offset <= 1e-3 {
            continue;
        }
        let row_dist = frame.half_h / offset;
        let ray_dist = row_dist / ray.corr;
        let p = frame.origin + ray.dir * ray_dist;

        let sector = if path.is_empty() {
            frame.cam_sector
        } else {
            trace::sector_at(path, ray_dist)
        };
        let Some(sec) = sector.and_then(|s| world.sector(s)) else {
            continue;
        };

        let tex = scene
            .textures
            .texture_or_missing(if floor { sec.floor_tex } else { sec.ceil_tex });
        let base = tex.sample_tiled(p.x, p.y);
        let c = scene
            .lighting
            .apply(base, row_dist, sec.light, sec.tint, &world.lights, p);

        let idx = y as usize * fb.width + ray.x;
        fb.pixels[idx] = c;
        if let Some(d) = depth.as_deref_mut() {
            d.depth[idx] = row_dist;
        }
    }
}

/*──────────────────────── Renderer trait impl ────────────────────────*/
impl Renderer for Raycaster {
    fn begin_frame(&mut self, w: usize, h: usize) {
        // (re)allocate if resolution changed
        if w != self.width || h != self.height {
            tracing::debug!(w, h, "raycaster resize");
            self.width = w;
            self.height = h;
            self.wall_depth.resize(w, f32::INFINITY);
            self.pixel_depth.resize(w, h);
        }
    }

    fn render(&mut self, fb: &mut Framebuffer, scene: &Scene<'_>) {
        self.begin_frame(fb.width, fb.height);
        self.stats = RenderStats::default();
        fb.clear(self.config.clear_color);
        self.wall_depth.fill(f32::INFINITY);
        self.pixel_depth.clear();

        if fb.width == 0 || fb.height == 0 || fb.pixels.len() < fb.width * fb.height {
            return;
        }
        if !scene.mesh.matches(scene.world) {
            tracing::debug!("level mesh out of date, frame skipped");
            return;
        }

        let cam = scene.camera;
        // A hint the camera has already left (mid step-up) would hide
        // every wall from the walk.
        let cam_sector = scene
            .start_sector
            .filter(|&s| scene.world.point_in_sector(s, cam.pos))
            .or_else(|| scene.world.find_sector_at_point(cam.pos));

        let frame = Frame {
            scene,
            origin: cam.pos,
            view_rad: cam.angle_rad(),
            half_h: fb.height as f32 * 0.5,
            cam_sector,
        };

        for x in 0..fb.width {
            let ray_rad = cam.column_angle(x, fb.width);
            let (s, c) = ray_rad.sin_cos();
            let ray = ColumnRay {
                x,
                dir: Vec2::new(c, s),
                corr: (ray_rad - frame.view_rad).cos().max(0.001),
            };
            self.draw_column(fb, &frame, ray);
        }
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{FalloffLighting, RendererExt};
    use crate::world::{Camera, Texture, TextureBank, World, WorldBuilder};
    use glam::vec2;

    const W: usize = 65;
    const H: usize = 48;

    /* tiny helpers ---------------------------------------------------*/
    fn square_room() -> World {
        let mut b = WorldBuilder::new();
        let s = b.sector(0.0, 3.0);
        b.room(s, &[vec2(-5.0, -5.0), vec2(5.0, -5.0), vec2(5.0, 5.0), vec2(-5.0, 5.0)]);
        b.build()
    }

    fn render(world: &World, cam: &Camera, config: RenderConfig) -> (Raycaster, Framebuffer) {
        let mesh = LevelMesh::build(world);
        let bank = TextureBank::default_with_checker();
        let lighting = FalloffLighting::default();
        let scene = Scene {
            world,
            mesh: &mesh,
            camera: cam,
            start_sector: None,
            textures: &bank,
            lighting: &lighting,
        };
        let mut rc = Raycaster::new(W, H, config);
        let mut fb = Framebuffer::new(W, H);
        rc.render(&mut fb, &scene);
        (rc, fb)
    }

    #[test]
    fn centre_column_sees_wall_five_units_ahead() {
        let world = square_room();
        let cam = Camera::new(Vec2::ZERO, 0.0, 60.0);
        let (rc, _) = render(&world, &cam, RenderConfig::default());
        assert!((rc.wall_depth()[W / 2] - 5.0).abs() < 1e-3);
        assert_eq!(rc.stats().columns_hit, W);
    }

    #[test]
    fn rendering_is_deterministic() {
        let world = square_room();
        let cam = Camera::new(vec2(1.3, -0.7), 33.0, 75.0);
        let (a, fa) = render(&world, &cam, RenderConfig::default());
        let (b, fb) = render(&world, &cam, RenderConfig::default());
        assert_eq!(fa, fb);
        assert_eq!(a.wall_depth(), b.wall_depth());
        assert_eq!(a.pixel_depth(), b.pixel_depth());
    }

    #[test]
    fn every_pixel_of_a_sealed_room_gets_depth() {
        let world = square_room();
        let cam = Camera::new(Vec2::ZERO, 10.0, 90.0);
        let (rc, _) = render(&world, &cam, RenderConfig::default());
        let d = rc.pixel_depth();
        // only a centre row of an odd-height screen could be skipped
        let written = d.depth.iter().filter(|v| v.is_finite()).count();
        assert!(written >= W * (H - 1));
        // wall pixels carry the wall distance
        let mid = d.get(W / 2, H / 2);
        assert!((mid - rc.wall_depth()[W / 2]).abs() < 1e-5);
    }

    #[test]
    fn pixel_depth_can_be_disabled() {
        let world = square_room();
        let cam = Camera::new(Vec2::ZERO, 0.0, 60.0);
        let cfg = RenderConfig {
            write_pixel_depth: false,
            ..Default::default()
        };
        let (rc, _) = render(&world, &cam, cfg);
        assert!(rc.pixel_depth().depth.iter().all(|v| v.is_infinite()));
        assert!(rc.wall_depth()[W / 2].is_finite());
    }

    #[test]
    fn open_side_draws_planes_only() {
        let mut b = WorldBuilder::new();
        let s = b.sector(0.0, 3.0);
        let v = [vec2(-5.0, -5.0), vec2(5.0, -5.0), vec2(5.0, 5.0), vec2(-5.0, 5.0)].map(|p| b.vertex(p));
        // no west wall
        b.wall(v[0], v[1], s, None, 0);
        b.wall(v[1], v[2], s, None, 0);
        b.wall(v[2], v[3], s, None, 0);
        let world = b.build();

        let cam = Camera::new(Vec2::ZERO, 180.0, 10.0);
        let (rc, fb) = render(&world, &cam, RenderConfig::default());
        assert!(rc.wall_depth()[W / 2].is_infinite());
        // bottom row is floor, one unit per half screen height away
        let bottom = rc.pixel_depth().get(W / 2, H - 1);
        assert!((bottom - (H as f32 * 0.5) / (H as f32 - 0.5 - H as f32 * 0.5)).abs() < 1e-4);
        assert_ne!(fb.get(W / 2, H - 1), Some(RenderConfig::default().clear_color));
    }

    #[test]
    fn trace_modes_agree_on_sealed_level() {
        let mut b = WorldBuilder::new();
        for i in 0..3 {
            let s = b.sector(0.0, 3.0);
            let x = i as f32 * 4.0;
            b.room(s, &[vec2(x, 0.0), vec2(x + 4.0, 0.0), vec2(x + 4.0, 4.0), vec2(x, 4.0)]);
        }
        b.link_portals();
        let world = b.build();
        let cam = Camera::new(vec2(1.0, 2.2), 5.0, 70.0);

        let (walk, fw) = render(&world, &cam, RenderConfig::default());
        let flat_cfg = RenderConfig {
            trace_mode: TraceMode::FlatScan,
            ..Default::default()
        };
        let (flat, ff) = render(&world, &cam, flat_cfg);

        for (a, b) in walk.wall_depth().iter().zip(flat.wall_depth()) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
        let same = fw.pixels.iter().zip(&ff.pixels).filter(|(a, b)| a == b).count();
        assert!(same * 100 >= fw.pixels.len() * 99);
        assert!(walk.stats().max_portal_depth >= 1);
        assert_eq!(flat.stats().max_portal_depth, 0);
    }

    #[test]
    fn stale_start_sector_is_not_trusted() {
        let mut b = WorldBuilder::new();
        for i in 0..3 {
            let s = b.sector(0.0, 3.0);
            let x = i as f32 * 4.0;
            b.room(s, &[vec2(x, 0.0), vec2(x + 4.0, 0.0), vec2(x + 4.0, 4.0), vec2(x, 4.0)]);
        }
        b.link_portals();
        let world = b.build();
        let mesh = LevelMesh::build(&world);
        let bank = TextureBank::default_with_checker();
        let lighting = FalloffLighting::default();
        // just past the first portal, still tagged with the room behind
        let cam = Camera::new(vec2(4.05, 2.0), 0.0, 70.0);
        let scene = Scene {
            world: &world,
            mesh: &mesh,
            camera: &cam,
            start_sector: Some(0),
            textures: &bank,
            lighting: &lighting,
        };

        let mut rc = Raycaster::new(W, H, RenderConfig::default());
        let mut fb = Framebuffer::new(W, H);
        rc.render(&mut fb, &scene);
        assert_eq!(rc.stats().columns_hit, W);
        assert!((rc.wall_depth()[W / 2] - 7.95).abs() < 1e-3);
    }

    #[test]
    fn draw_frame_submits_the_buffer() {
        let world = square_room();
        let mesh = LevelMesh::build(&world);
        let mut bank = TextureBank::default_with_checker();
        bank.add(Texture::solid("RED", abgr(0xFF, 0, 0, 0xFF))).unwrap();
        let lighting = FalloffLighting::default();
        let cam = Camera::new(Vec2::ZERO, 0.0, 60.0);
        let scene = Scene {
            world: &world,
            mesh: &mesh,
            camera: &cam,
            start_sector: Some(0),
            textures: &bank,
            lighting: &lighting,
        };

        let mut rc = Raycaster::new(8, 8, RenderConfig::default());
        let mut fb = Framebuffer::new(16, 12);
        let mut seen = None;
        rc.draw_frame(&mut fb, &scene, |f| seen = Some((f.width, f.height)));
        assert_eq!(seen, Some((16, 12)));
        assert_eq!(rc.wall_depth().len(), 16);
    }
}
