mod body;
pub mod collision;
mod components;
pub mod sector_height;
mod systems;
mod tic;

pub use body::{BodyMotion, PhysicsBody, PhysicsBodyParams, StepUp};
pub use components::{Angle, InputCmd, Player, WishVel};
pub use sector_height::{FloorParams, try_toggle_touching_wall, update_movable_floors};
pub use systems::{MOVE_SPEED, TURN_RATE, physics, player_input, use_switch};
pub use tic::{FixedStep, SIM_HZ, TicRunner};
