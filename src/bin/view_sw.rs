//! Interactive first-person viewer for a built-in demo level.
//!
//! ```bash
//! RUST_LOG=portalcast=debug cargo run --release -- --width 480 --height 300 --scale 2
//! ```
//!
//! Arrows / WASD move and turn, Shift runs, Space uses a switch, E opens or
//! closes the door, Tab swaps the trace mode, Esc quits.

use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use glam::{Vec2, vec2};
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};
use tracing_subscriber::EnvFilter;

use portalcast::{
    renderer::{
        FalloffLighting, Framebuffer, LevelMesh, Raycaster, RenderConfig, RendererExt, Scene,
        TraceMode, abgr,
    },
    sim::{FixedStep, InputCmd, MOVE_SPEED, PhysicsBody, TicRunner},
    world::{
        Camera, LightColor, PointLight, Texture, TextureBank, TextureId, WallId, World,
        WorldBuilder,
    },
};

const EYE_HEIGHT: f32 = 1.6;
const BOB_AMPLITUDE: f32 = 0.04;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TraceArg {
    Portal,
    Flat,
}

impl From<TraceArg> for TraceMode {
    fn from(t: TraceArg) -> Self {
        match t {
            TraceArg::Portal => TraceMode::PortalWalk,
            TraceArg::Flat => TraceMode::FlatScan,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Software raycaster demo")]
struct Args {
    /// Framebuffer width in pixels
    #[arg(long, default_value_t = 480)]
    width: usize,
    /// Framebuffer height in pixels
    #[arg(long, default_value_t = 300)]
    height: usize,
    /// Window scale factor (1, 2, 4 or 8)
    #[arg(long, default_value_t = 2)]
    scale: u8,
    /// Horizontal field of view in degrees
    #[arg(long, default_value_t = 75.0)]
    fov: f32,
    #[arg(long, value_enum, default_value_t = TraceArg::Portal)]
    trace: TraceArg,
    /// Simulation rate
    #[arg(long, default_value_t = 60)]
    hz: u32,
}

fn window_scale(s: u8) -> Scale {
    match s {
        0 | 1 => Scale::X1,
        2 | 3 => Scale::X2,
        4..=7 => Scale::X4,
        _ => Scale::X8,
    }
}

/*──────────────────────────── demo content ───────────────────────────*/

struct DemoTextures {
    brick: TextureId,
    tile: TextureId,
    ceil: TextureId,
    switch_off: TextureId,
    switch_on: TextureId,
}

fn demo_textures(bank: &mut TextureBank) -> anyhow::Result<DemoTextures> {
    let brick = Texture::from_fn("BRICK", 32, 32, |x, y| {
        let row = y / 8;
        let shift = if row % 2 == 0 { 0 } else { 8 };
        if y % 8 == 0 || (x + shift) % 16 == 0 {
            abgr(0x60, 0x58, 0x50, 0xFF)
        } else {
            abgr(0xA0, 0x48, 0x38, 0xFF)
        }
    });
    let tile = Texture::from_fn("TILE", 16, 16, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            abgr(0x70, 0x70, 0x78, 0xFF)
        } else {
            abgr(0x40, 0x40, 0x48, 0xFF)
        }
    });
    let ceil = Texture::from_fn("CEIL", 8, 8, |x, y| {
        if x == 0 || y == 0 {
            abgr(0x30, 0x30, 0x30, 0xFF)
        } else {
            abgr(0x50, 0x50, 0x58, 0xFF)
        }
    });
    let lamp = |on: bool| {
        move |x: usize, y: usize| {
            let inside = (12..20).contains(&x) && (12..20).contains(&y);
            match (inside, on) {
                (true, true) => abgr(0x30, 0xE0, 0x30, 0xFF),
                (true, false) => abgr(0xE0, 0x30, 0x30, 0xFF),
                _ => abgr(0x58, 0x58, 0x60, 0xFF),
            }
        }
    };

    Ok(DemoTextures {
        brick: bank.add(brick)?,
        tile: bank.add(tile)?,
        ceil: bank.add(ceil)?,
        switch_off: bank.add(Texture::from_fn("SWITCH_OFF", 32, 32, lamp(false)))?,
        switch_on: bank.add(Texture::from_fn("SWITCH_ON", 32, 32, lamp(true)))?,
    })
}

/// Hall → raised lift → red-lit room. Returns the level and the door wall.
fn demo_level(t: &DemoTextures) -> anyhow::Result<(World, WallId)> {
    let mut b = WorldBuilder::new();

    let hall = b.sector(0.0, 3.0);
    let lift = b.sector(0.2, 2.8);
    let room = b.sector(0.0, 3.5);
    for s in [hall, lift, room] {
        b.sector_textures(s, t.tile, t.ceil);
    }
    b.movable_floor(lift, 0.8);
    b.sector_light(room, 0.7, LightColor::new(1.0, 0.85, 0.85));

    b.room_textured(
        hall,
        &[
            vec2(0.0, 0.0),
            vec2(8.0, 0.0),
            vec2(8.0, 2.0),
            vec2(8.0, 6.0),
            vec2(8.0, 8.0),
            vec2(0.0, 8.0),
        ],
        t.brick,
    );
    let lift_walls = b.room_textured(
        lift,
        &[vec2(8.0, 2.0), vec2(12.0, 2.0), vec2(12.0, 6.0), vec2(8.0, 6.0)],
        t.brick,
    );
    let room_walls = b.room_textured(
        room,
        &[
            vec2(12.0, 0.0),
            vec2(20.0, 0.0),
            vec2(20.0, 8.0),
            vec2(12.0, 8.0),
            vec2(12.0, 6.0),
            vec2(12.0, 2.0),
        ],
        t.brick,
    );
    b.link_portals();

    // (20,0) → (20,8): the switch that drives the lift
    let switch = room_walls.start + 1;
    b.wall_texture(switch, t.switch_off);
    b.toggle_wall(switch, Some(lift as i32), Some(t.switch_on), false);

    b.light(PointLight::new(vec2(16.0, 4.0), 5.0, 0.6).with_color(LightColor::new(1.0, 0.3, 0.2)));
    b.player_start(vec2(2.0, 4.0), 0.0);

    let world = b.build();
    world.validate()?;
    // lift east edge (12,2) → (12,6)
    Ok((world, lift_walls.start + 1))
}

/*──────────────────────────────── main ───────────────────────────────*/

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let (w, h) = (args.width.max(2), args.height.max(2));

    let mut bank = TextureBank::default_with_checker();
    let textures = demo_textures(&mut bank)?;
    let (mut level, door) = demo_level(&textures)?;
    let mesh = LevelMesh::build(&level);
    let lighting = FalloffLighting::default();

    let mut sim = TicRunner::new();
    sim.clock = FixedStep::new(args.hz);
    let proto = PhysicsBody::new(Vec2::ZERO, 0.0, 0.3, 1.7, 0.25);
    sim.spawn_player(&level, proto, vec2(2.0, 4.0));

    let mut config = RenderConfig {
        trace_mode: args.trace.into(),
        ..Default::default()
    };
    let mut renderer = Raycaster::new(w, h, config);
    let mut fb = Framebuffer::new(w, h);
    let mut present = vec![0u32; w * h];

    let opts = WindowOptions {
        scale: window_scale(args.scale),
        ..WindowOptions::default()
    };
    let mut win = Window::new("portalcast", w, h, opts)?;
    win.set_target_fps(0);

    let mut door_open = true;
    let mut bob_phase = 0.0f32;
    let mut last_frame = Instant::now();

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let t0 = Instant::now();
        let frame_dt = t0.duration_since(last_frame).as_secs_f32();
        last_frame = t0;

        /* --------------- build one InputCmd per frame -------------------- */
        let mut cmd = InputCmd::default();
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            cmd.forward += 1.0;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            cmd.forward -= 1.0;
        }
        if win.is_key_down(Key::Left) {
            cmd.turn -= 1.0;
        }
        if win.is_key_down(Key::Right) {
            cmd.turn += 1.0;
        }
        if win.is_key_down(Key::A) {
            cmd.strafe -= 1.0;
        }
        if win.is_key_down(Key::D) {
            cmd.strafe += 1.0;
        }
        cmd.run = win.is_key_down(Key::LeftShift) || win.is_key_down(Key::RightShift);
        cmd.use_act = win.is_key_down(Key::Space);

        if win.is_key_pressed(Key::E, KeyRepeat::No) {
            door_open = !door_open;
            level.set_door_blocked(door, !door_open);
            tracing::info!(door_open, "door");
        }
        if win.is_key_pressed(Key::Tab, KeyRepeat::No) {
            config.trace_mode = match config.trace_mode {
                TraceMode::PortalWalk => TraceMode::FlatScan,
                TraceMode::FlatScan => TraceMode::PortalWalk,
            };
            renderer.set_config(config);
            tracing::info!(mode = ?config.trace_mode, "trace mode");
        }

        /* --------------- simulate --------------------------------------- */
        sim.pump(&mut level, t0, cmd);

        let Some((body, angle)) = sim.player_view() else {
            break;
        };
        let speed = body.vel.truncate().length();
        let bob = if body.on_ground {
            bob_phase += frame_dt * speed * 3.0;
            bob_phase.sin() * BOB_AMPLITUDE * (speed / MOVE_SPEED).min(1.0)
        } else {
            0.0
        };
        let camera = Camera::from_body(&body, angle, args.fov, EYE_HEIGHT, bob);

        /* --------------- draw ------------------------------------------- */
        let scene = Scene {
            world: &level,
            mesh: &mesh,
            camera: &camera,
            start_sector: body.display_sector(),
            textures: &bank,
            lighting: &lighting,
        };
        let mut shown = Ok(());
        renderer.draw_frame(&mut fb, &scene, |f| {
            acc_time += t0.elapsed();
            acc_frames += 1;
            f.to_0rgb(&mut present);
            shown = win.update_with_buffer(&present, f.width, f.height);
        });
        shown?;

        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames.max(1) as f64;
            let stats = renderer.stats();
            tracing::info!(
                avg_ms = format_args!("{avg_ms:.2}"),
                fps = format_args!("{:.1}", 1000.0 / avg_ms),
                walls_tested = stats.walls_tested,
                portal_depth = stats.max_portal_depth,
                "render"
            );
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}
