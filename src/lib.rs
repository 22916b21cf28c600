#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Blockscape
//!
//! The world core of a block-based voxel game: a dense block grid with decorative
//! entities, procedural terrain generators, face-culled chunk meshing with a fake
//! shadow and torch lighting model, and a chunk streamer that keeps the meshes around the
//! viewer up to date under a per-interval budget.
//!
//! The crate never talks to a graphics API. Every frame's geometry is handed to a
//! `RenderSink`, and everything it needs to know about the viewer comes through the
//! `CameraView` trait.
//!
//! ## Key Modules
//!
//! * `core` - Single-threaded shared resources and typed change channels
//! * `engine_state` - Terrain, meshing, chunk streaming and the `EngineState` that owns them
//!
//! ## Usage
//!
//! ```rust
//! use blockscape::engine_state::config::EngineConfig;
//! use blockscape::engine_state::EngineState;
//!
//! blockscape::init_logging();
//! let engine = EngineState::new(EngineConfig::default()).unwrap();
//! assert_eq!(engine.terrain().dimensions().y, 64);
//! ```

pub mod core;
pub mod engine_state;

/// Initializes the `env_logger` backend, filtered by `RUST_LOG` and writing to stdout.
///
/// Calling it again after a logger is installed does nothing.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    let initialized = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init();

    if initialized.is_ok() {
        log::info!("Logger initialized");
    }
}
