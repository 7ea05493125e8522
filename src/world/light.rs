use glam::Vec2;

/// Per-channel light multiplier, every channel expected in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl LightColor {
    pub const WHITE: LightColor = LightColor::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl Default for LightColor {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Additive point light authored in the level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub pos: Vec2,
    pub z: f32,
    pub radius: f32,
    /// Base brightness in `[0, +inf)`.
    pub intensity: f32,
    pub color: LightColor,
}

impl PointLight {
    pub fn new(pos: Vec2, radius: f32, intensity: f32) -> Self {
        Self {
            pos,
            z: 0.0,
            radius,
            intensity,
            color: LightColor::WHITE,
        }
    }

    pub fn with_color(mut self, color: LightColor) -> Self {
        self.color = color;
        self
    }

    /// Contribution in `[0, intensity]` at `p`; zero outside the radius.
    #[inline]
    pub fn contribution(&self, p: Vec2) -> f32 {
        if self.radius <= 0.0 || self.intensity <= 0.0 {
            return 0.0;
        }
        let d2 = self.pos.distance_squared(p);
        let r2 = self.radius * self.radius;
        if d2 >= r2 {
            return 0.0;
        }
        let t = 1.0 - d2.sqrt() / self.radius;
        self.intensity * t.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;

    #[test]
    fn contribution_fades_to_zero_at_radius() {
        let l = PointLight::new(Vec2::ZERO, 4.0, 1.0);
        assert!((l.contribution(Vec2::ZERO) - 1.0).abs() < 1e-6);
        assert!((l.contribution(vec2(2.0, 0.0)) - 0.5).abs() < 1e-6);
        assert_eq!(l.contribution(vec2(4.0, 0.0)), 0.0);
        assert_eq!(l.contribution(vec2(9.0, 9.0)), 0.0);
    }

    #[test]
    fn dead_lights_contribute_nothing() {
        assert_eq!(PointLight::new(Vec2::ZERO, 0.0, 1.0).contribution(Vec2::ZERO), 0.0);
        assert_eq!(PointLight::new(Vec2::ZERO, 3.0, 0.0).contribution(Vec2::ZERO), 0.0);
    }
}
