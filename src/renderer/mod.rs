//! Rendering abstraction layer.
//!
//! *The simulation never touches a pixel buffer directly.*
//! It hands a [`Scene`] (level, camera, textures, lighting) to a type that
//! implements [`Renderer`], which fills a [`Framebuffer`].
//!
//! * Pixels are **ABGR8888** (`0xAABBGGRR`): red in the low byte.
//! * A blanket-impl [`RendererExt`] adds `draw_frame` so call-sites stay
//!   short.

use crate::world::{Camera, SectorId, TextureBank, World};

pub mod lighting;
pub mod software;

pub use lighting::{FalloffLighting, Lighting};
pub use software::{LevelMesh, MAX_PORTAL_DEPTH, Raycaster, RenderConfig, RenderStats, TraceMode};

/// Pixel format of the software frame-buffer (0xAABBGGRR).
pub type Rgba = u32;

/// Pack 8-bit channels into an ABGR8888 pixel.
#[inline(always)]
pub const fn abgr(r: u8, g: u8, b: u8, a: u8) -> Rgba {
    (a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32
}

/// Split an ABGR8888 pixel into `(r, g, b, a)`.
#[inline(always)]
pub const fn unpack(c: Rgba) -> (u8, u8, u8, u8) {
    (
        (c & 0xFF) as u8,
        ((c >> 8) & 0xFF) as u8,
        ((c >> 16) & 0xFF) as u8,
        (c >> 24) as u8,
    )
}

/*───────────────────────────── buffers ─────────────────────────────*/

/// Row-major colour target owned by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Rgba>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    /// Change the resolution; contents are undefined afterwards.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width * height, 0);
    }

    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    /// Convert into minifb's `0x00RRGGBB` layout.
    pub fn to_0rgb(&self, out: &mut [u32]) {
        for (dst, &src) in out.iter_mut().zip(&self.pixels) {
            let (r, g, b, _) = unpack(src);
            *dst = (r as u32) << 16 | (g as u32) << 8 | b as u32;
        }
    }
}

/// Row-major `f32` distances; `INFINITY` means "nothing written".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DepthBuffer {
    pub width: usize,
    pub height: usize,
    pub depth: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            depth: vec![f32::INFINITY; width * height],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth.resize(width * height, f32::INFINITY);
    }

    pub fn clear(&mut self) {
        self.depth.fill(f32::INFINITY);
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        if x < self.width && y < self.height {
            self.depth[y * self.width + x]
        } else {
            f32::INFINITY
        }
    }
}

/*───────────────────────────── renderer ────────────────────────────*/

/// Everything a renderer reads to draw one frame.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    pub world: &'a World,
    pub mesh: &'a LevelMesh,
    pub camera: &'a Camera,
    /// Sector holding the camera; `None` falls back to a flat scan.
    pub start_sector: Option<SectorId>,
    pub textures: &'a TextureBank,
    pub lighting: &'a dyn Lighting,
}

/// A renderer that owns whatever per-frame scratch it needs.
pub trait Renderer {
    /// (Re)allocate internal scratch for the requested resolution.
    fn begin_frame(&mut self, width: usize, height: usize);

    /// Draw `scene` into `fb`.
    fn render(&mut self, fb: &mut Framebuffer, scene: &Scene<'_>);
}

/// Convenience blanket-impl with a one-liner `draw_frame` adaptor.
pub trait RendererExt: Renderer {
    /// Draw `scene` and **loan** the finished buffer to `submit`.
    fn draw_frame<F>(&mut self, fb: &mut Framebuffer, scene: &Scene<'_>, submit: F)
    where
        F: FnOnce(&Framebuffer),
    {
        self.begin_frame(fb.width, fb.height);
        self.render(fb, scene);
        submit(fb);
    }
}
impl<T: Renderer + ?Sized> RendererExt for T {}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abgr_layout() {
        let c = abgr(0x11, 0x22, 0x33, 0x44);
        assert_eq!(c, 0x4433_2211);
        assert_eq!(unpack(c), (0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn minifb_conversion_swaps_channels() {
        let mut fb = Framebuffer::new(2, 1);
        fb.pixels[0] = abgr(0xAA, 0xBB, 0xCC, 0xFF);
        let mut out = [0u32; 2];
        fb.to_0rgb(&mut out);
        assert_eq!(out[0], 0x00AA_BBCC);
        assert_eq!(out[1], 0);
    }

    #[test]
    fn depth_buffer_out_of_range_is_infinite() {
        let d = DepthBuffer::new(4, 4);
        assert_eq!(d.get(1, 1), f32::INFINITY);
        assert_eq!(d.get(9, 0), f32::INFINITY);
    }
}
