use glam::Vec2;
use hecs::{Entity, World as Ecs};

use super::body::PhysicsBodyParams;
use super::components::{Angle, InputCmd, PhysicsBody, WishVel};
use super::sector_height;
use crate::world::World;

pub const MOVE_SPEED: f32 = 3.0; // units / second
pub const RUN_FACTOR: f32 = 1.5;
pub const TURN_RATE: f32 = 180.0; // degrees / second

/// Turn the player and set its wish velocity from this tic's input.
pub fn player_input(ecs: &mut Ecs, player: Entity, cmd: InputCmd, dt: f32) {
    let Ok(mut q) = ecs.query_one::<(&mut Angle, &mut WishVel)>(player) else {
        return;
    };
    let Some((ang, wish)) = q.get() else {
        return;
    };

    /* 1. turn */
    if cmd.turn != 0.0 {
        ang.0 = (ang.0 + cmd.turn * TURN_RATE * dt).rem_euclid(360.0);
    }

    /* 2. wish-vel */
    let speed = if cmd.run {
        MOVE_SPEED * RUN_FACTOR
    } else {
        MOVE_SPEED
    };
    let (s, c) = ang.0.to_radians().sin_cos();
    let fwd = Vec2::new(c, s);
    let right = Vec2::new(-fwd.y, fwd.x);
    let dir = fwd * cmd.forward + right * cmd.strafe;
    wish.0 = dir.normalize_or_zero() * speed;
}

/// "Use" pressed by `actor`: flip a floor switch it is touching.
pub fn use_switch(ecs: &Ecs, level: &mut World, actor: Entity) -> bool {
    let Ok(body) = ecs.get::<&PhysicsBody>(actor) else {
        return false;
    };
    sector_height::try_toggle_touching_wall(level, &body)
}

/// Move every body by its wish velocity.
pub fn physics(ecs: &mut Ecs, level: &World, params: &PhysicsBodyParams, dt: f32) {
    for (_, (body, wish)) in ecs.query_mut::<(&mut PhysicsBody, &WishVel)>() {
        body.update(level, wish.0, dt, params);
    }
}
