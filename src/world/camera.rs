use glam::{Vec2, vec2};

use crate::sim::PhysicsBody;

/// Player view-point in world space, rebuilt every frame.
///
/// * Only **yaw** (heading) is simulated – no pitch, no roll.
/// * `eye_z` is the absolute eye height, handed to sprite compositors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub pos: Vec2,      // x,y in map-units
    pub eye_z: f32,     // world-space eye height
    pub angle_deg: f32, // 0 = east, grows towards +Y
    pub fov_deg: f32,   // horizontal FoV
}

impl Camera {
    /// Create a new camera at `pos`, facing `angle_deg`, with horizontal FoV `fov_deg`.
    pub fn new(pos: Vec2, angle_deg: f32, fov_deg: f32) -> Self {
        Self {
            pos,
            eye_z: 0.0,
            angle_deg,
            fov_deg,
        }
    }

    /// Camera riding on `body`: eye at `eye_height` above the feet plus any
    /// view-bob offset.
    pub fn from_body(
        body: &PhysicsBody,
        angle_deg: f32,
        fov_deg: f32,
        eye_height: f32,
        bob: f32,
    ) -> Self {
        Self {
            pos: body.pos,
            eye_z: body.z + eye_height + bob,
            angle_deg,
            fov_deg,
        }
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    #[inline]
    pub fn angle_rad(&self) -> f32 {
        self.angle_deg.to_radians()
    }

    /// Unit vector pointing where the camera looks on the X-Y plane.
    #[inline(always)]
    pub fn forward(&self) -> Vec2 {
        let (s, c) = self.angle_rad().sin_cos();
        vec2(c, s) // 0 rad = +X (east)
    }

    /// Unit vector pointing to the camera's right on screen (towards the
    /// last column).
    #[inline(always)]
    pub fn right(&self) -> Vec2 {
        let f = self.forward();
        vec2(-f.y, f.x)
    }

    /// Ray angle (radians) of screen column `x` out of `width`. Columns
    /// evenly span `[angle - fov/2, angle + fov/2]`; map Y grows downwards on
    /// screen, so increasing angle sweeps left to right.
    #[inline]
    pub fn column_angle(&self, x: usize, width: usize) -> f32 {
        let lerp = if width > 1 {
            x as f32 / (width - 1) as f32
        } else {
            0.5
        };
        (self.angle_deg - self.fov_deg * 0.5 + lerp * self.fov_deg).to_radians()
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Rotate around Z-axis (positive = turn right on screen).
    pub fn turn(&mut self, delta_deg: f32) {
        self.angle_deg = (self.angle_deg + delta_deg).rem_euclid(360.0);
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
