use glam::Vec2;

use super::{Rgba, abgr, unpack};
use crate::world::{LightColor, PointLight};

/// Shading applied to every wall and plane texel the raycaster writes.
pub trait Lighting {
    /// Light `base` seen at `distance`, inside a sector of brightness
    /// `intensity` and colour `tint`, sampled at world point `hit`.
    fn apply(
        &self,
        base: Rgba,
        distance: f32,
        intensity: f32,
        tint: LightColor,
        lights: &[PointLight],
        hit: Vec2,
    ) -> Rgba;
}

/// Distance falloff × sector light × tint, plus additive point lights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FalloffLighting {
    pub falloff: f32,
    /// Multipliers never drop below this, so nothing goes fully black.
    pub floor: f32,
}

impl Default for FalloffLighting {
    fn default() -> Self {
        Self {
            falloff: 0.15,
            floor: 0.06,
        }
    }
}

impl FalloffLighting {
    #[inline]
    pub fn distance_factor(&self, distance: f32) -> f32 {
        1.0 / (1.0 + distance.max(0.0) * self.falloff)
    }
}

#[inline]
fn scale(c: u8, mul: f32) -> u8 {
    (c as f32 * mul).round().clamp(0.0, 255.0) as u8
}

impl Lighting for FalloffLighting {
    fn apply(
        &self,
        base: Rgba,
        distance: f32,
        intensity: f32,
        tint: LightColor,
        lights: &[PointLight],
        hit: Vec2,
    ) -> Rgba {
        let k = self.distance_factor(distance) * intensity.clamp(0.0, 1.0);
        let mut mul = [
            k * tint.r.clamp(0.0, 1.0),
            k * tint.g.clamp(0.0, 1.0),
            k * tint.b.clamp(0.0, 1.0),
        ];

        for l in lights {
            let a = l.contribution(hit);
            if a <= 0.0 {
                continue;
            }
            mul[0] += a * l.color.r.clamp(0.0, 1.0);
            mul[1] += a * l.color.g.clamp(0.0, 1.0);
            mul[2] += a * l.color.b.clamp(0.0, 1.0);
        }

        let [mr, mg, mb] = mul.map(|m| m.clamp(self.floor, 1.0));
        let (r, g, b, a) = unpack(base);
        abgr(scale(r, mr), scale(g, mg), scale(b, mb), a)
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    const GREY: Rgba = abgr(200, 200, 200, 0xFF);

    #[test]
    fn full_light_at_zero_distance_is_identity() {
        let l = FalloffLighting::default();
        let c = l.apply(GREY, 0.0, 1.0, LightColor::WHITE, &[], Vec2::ZERO);
        assert_eq!(c, GREY);
    }

    #[test]
    fn falloff_darkens_with_distance() {
        let l = FalloffLighting::default();
        // 1 / (1 + 10 * 0.15) = 0.4
        let c = l.apply(GREY, 10.0, 1.0, LightColor::WHITE, &[], Vec2::ZERO);
        assert_eq!(c, abgr(80, 80, 80, 0xFF));
    }

    #[test]
    fn never_fully_black() {
        let l = FalloffLighting::default();
        let c = l.apply(abgr(100, 100, 100, 7), 0.0, 0.0, LightColor::WHITE, &[], Vec2::ZERO);
        assert_eq!(c, abgr(6, 6, 6, 7));
    }

    #[test]
    fn tint_and_point_lights_per_channel() {
        let l = FalloffLighting::default();
        let red_only = LightColor::new(1.0, 0.0, 0.0);
        let c = l.apply(GREY, 0.0, 1.0, red_only, &[], Vec2::ZERO);
        assert_eq!(unpack(c), (200, 12, 12, 0xFF));

        let blue = PointLight::new(Vec2::ZERO, 2.0, 1.0).with_color(LightColor::new(0.0, 0.0, 1.0));
        let c = l.apply(GREY, 0.0, 1.0, red_only, &[blue], Vec2::ZERO);
        assert_eq!(unpack(c), (200, 12, 200, 0xFF));
    }
}
