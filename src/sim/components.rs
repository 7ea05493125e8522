use glam::Vec2;

pub use super::body::PhysicsBody;

/// Heading in degrees; 0 = east, grows towards +Y.
#[derive(Debug, Clone, Copy, Default)]
pub struct Angle(pub f32);

/// Desired horizontal velocity for the next tic, units / s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WishVel(pub Vec2);

/// Marks the entity driven by keyboard input.
#[derive(Debug, Clone, Copy)]
pub struct Player;

#[derive(Clone, Copy, Debug, Default)]
pub struct InputCmd {
    pub forward: f32,  // –1 … +1
    pub strafe: f32,   // –1 … +1  (left / right)
    pub turn: f32,     // –1 … +1  (left / right)
    pub run: bool,     // Shift
    pub use_act: bool, // Space
}
