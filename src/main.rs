//! # Blockscape Headless Driver
//!
//! Generates a world, walks a camera across it for a few seconds of simulated frames and
//! reports what the chunk streamer did. An optional argument names a JSON configuration
//! file.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- config.json
//! ```

use std::process::ExitCode;

use blockscape::engine_state::camera_state::{Camera, Projection};
use blockscape::engine_state::config::EngineConfig;
use blockscape::engine_state::rendering::CountingSink;
use blockscape::engine_state::EngineState;
use cgmath::{Deg, Point3};
use log::{error, info};
use web_time::{Duration, Instant};

const FRAMES: u32 = 600;
const FRAME_TIME: Duration = Duration::from_millis(16);

fn main() -> ExitCode {
    blockscape::init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("Could not load {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    let started = Instant::now();
    let mut engine = match EngineState::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Could not start the engine: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("World ready after {:?}", started.elapsed());

    let dims = engine.config().dimensions;
    let ground = dims.y as f32 / 2.0 + 4.0;
    let mut camera = Camera::new(
        (8.0, ground, dims.z as f32 / 2.0),
        Deg(0.0),
        Deg(-15.0),
        Projection::new(1280, 720, Deg(45.0), 0.1, 500.0),
    );

    let mut sink = CountingSink::new();
    let mut now = Duration::ZERO;
    for _ in 0..FRAMES {
        // walk along +x, one block every four frames
        let p = camera.position;
        let x = (p.x + 0.25).min(dims.x as f32 - 1.0);
        camera.set_position(Point3::new(x, p.y, p.z));

        engine.step(now, &camera, &mut sink);
        now += FRAME_TIME;
    }

    let stats = engine.renderer().stats();
    info!(
        "{} frames: {} draw calls, {} vertices, {} entity passes",
        FRAMES, sink.draw_calls, sink.vertices, sink.entity_passes
    );
    info!(
        "Streaming: {} allocations ({} forced), {} frees, {} mesh rebuilds, {} chunks resident",
        stats.allocations,
        stats.forced_allocations,
        stats.frees,
        stats.mesh_rebuilds,
        engine.renderer().allocated_count()
    );
    info!("Total run time {:?}", started.elapsed());
    ExitCode::SUCCESS
}
