//! Named wall and flat textures. Walls and sectors refer to them by
//! [`TextureId`]; names only matter while a level is being assembled.

use std::collections::HashMap;

use crate::renderer::{Rgba, abgr};

pub type TextureId = u16;

/// Slot 0 of every bank: the checkerboard drawn for unknown ids.
pub const NO_TEXTURE: TextureId = 0;

const MISSING_NAME: &str = "MISSING";

/// Row-major ABGR8888 texels, same layout as the framebuffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub w: usize,
    pub h: usize,
    pub pixels: Vec<Rgba>,
}

impl Default for Texture {
    fn default() -> Self {
        Self::checker(
            "CHECKER",
            8,
            abgr(0xB0, 0xB0, 0xB0, 0xFF),
            abgr(0x50, 0x50, 0x50, 0xFF),
        )
    }
}

impl Texture {
    /// `w`×`h` texture whose texel at (x, y) is `f(x, y)`.
    pub fn from_fn<S, F>(name: S, w: usize, h: usize, f: F) -> Self
    where
        S: Into<String>,
        F: Fn(usize, usize) -> Rgba,
    {
        let pixels = (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            name: name.into(),
            w,
            h,
            pixels,
        }
    }

    pub fn solid<S: Into<String>>(name: S, color: Rgba) -> Self {
        Self::from_fn(name, 1, 1, |_, _| color)
    }

    /// One-texel checkerboard of `size`×`size`.
    pub fn checker<S: Into<String>>(name: S, size: usize, a: Rgba, b: Rgba) -> Self {
        Self::from_fn(name, size, size, |x, y| if (x ^ y) & 1 == 0 { a } else { b })
    }

    #[inline]
    fn is_consistent(&self) -> bool {
        self.w > 0 && self.h > 0 && self.pixels.len() == self.w * self.h
    }

    /// Texel nearest to (`u`, `v`), both clamped to `[0, 1]`. Malformed
    /// textures sample as transparent black.
    #[inline]
    pub fn sample_nearest(&self, u: f32, v: f32) -> Rgba {
        if !self.is_consistent() {
            return 0;
        }
        let col = ((u.clamp(0.0, 1.0) * self.w as f32) as usize).min(self.w - 1);
        let row = ((v.clamp(0.0, 1.0) * self.h as f32) as usize).min(self.h - 1);
        self.pixels[row * self.w + col]
    }

    /// Like [`sample_nearest`](Self::sample_nearest) but repeating every
    /// whole unit, for floors and ceilings.
    #[inline]
    pub fn sample_tiled(&self, u: f32, v: f32) -> Rgba {
        self.sample_nearest(u.rem_euclid(1.0), v.rem_euclid(1.0))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("texture `{0}` registered twice")]
    Duplicate(String),

    #[error("no texture with id {0}")]
    BadId(TextureId),

    #[error("texture `{name}` claims {w}x{h} texels but holds {len}")]
    BadSize {
        name: String,
        w: usize,
        h: usize,
        len: usize,
    },
}

/// Every texture a level may reference, addressed by id.
///
/// Ids are handed out in registration order and never change; id 0 is the
/// fallback texture.
pub struct TextureBank {
    ids: HashMap<String, TextureId>,
    textures: Vec<Texture>,
}

impl TextureBank {
    /// Bank holding only `fallback`, registered as `"MISSING"`.
    pub fn new(fallback: Texture) -> Self {
        Self {
            ids: HashMap::from([(MISSING_NAME.to_string(), NO_TEXTURE)]),
            textures: vec![fallback],
        }
    }

    pub fn default_with_checker() -> Self {
        Self::new(Texture::default())
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// True while only the fallback is present.
    pub fn is_empty(&self) -> bool {
        self.textures.len() <= 1
    }

    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.ids.get(name).copied()
    }

    /// Id for an authored texture name; unknown names get the fallback.
    pub fn resolve(&self, name: &str) -> TextureId {
        self.id(name).unwrap_or_else(|| {
            tracing::warn!(name, "unknown texture, using fallback");
            NO_TEXTURE
        })
    }

    pub fn texture(&self, id: TextureId) -> Result<&Texture, TextureError> {
        self.textures.get(id as usize).ok_or(TextureError::BadId(id))
    }

    /// Texture `id`, or the fallback for ids this bank never issued.
    #[inline]
    pub fn texture_or_missing(&self, id: TextureId) -> &Texture {
        match self.textures.get(id as usize) {
            Some(t) => t,
            None => &self.textures[NO_TEXTURE as usize],
        }
    }

    /// Register `tex` under its own name.
    pub fn add(&mut self, tex: Texture) -> Result<TextureId, TextureError> {
        if self.ids.contains_key(&tex.name) {
            return Err(TextureError::Duplicate(tex.name));
        }
        if !tex.is_consistent() {
            return Err(TextureError::BadSize {
                len: tex.pixels.len(),
                name: tex.name,
                w: tex.w,
                h: tex.h,
            });
        }
        let id = TextureId::try_from(self.textures.len())
            .map_err(|_| TextureError::BadId(TextureId::MAX))?;
        self.ids.insert(tex.name.clone(), id);
        self.textures.push(tex);
        Ok(id)
    }
}

impl Default for TextureBank {
    fn default() -> Self {
        Self::default_with_checker()
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
