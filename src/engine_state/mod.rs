//! # Engine State Module
//!
//! The core engine module that owns the world and drives it frame by frame.
//!
//! ## Key Components
//!
//! * `EngineState` - Owns the terrain, the simulation context and the chunk renderer
//! * `config` - Engine configuration, detail presets and world extents
//! * `error` - The crate error type
//! * `simulation` - Daylight schedule shared by every mesher
//! * `camera_state` - The camera query interface and a stock camera
//! * `voxels` - Block ids, entities, the block grid and the terrain around it
//! * `rendering` - Vertex generation, chunk meshes, entity batches and chunk streaming
//!
//! ## Frame
//!
//! `EngineState::step` runs one frame: it advances the daylight schedule, tells the
//! renderer when the viewer moved, and then lets the renderer rebuild, stream and draw.
//! Time is always passed in as the duration since engine start.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use cgmath::Point3;
use web_time::Duration;

pub mod camera_state;
pub mod config;
pub mod error;
pub mod rendering;
pub mod simulation;
pub mod voxels;

use camera_state::CameraView;
use config::EngineConfig;
use error::{EngineError, EngineResult};
use rendering::{ChunkMeshRenderer, MeshingContext, RenderSink};
use simulation::SimulationContext;
use voxels::terrain::generation::TerrainSource;
use voxels::terrain::Terrain;

const TERRAIN_EXTENSION: &str = "terrain";

/// The main state container for the engine core.
///
/// # Examples
///
/// ```
/// use blockscape::engine_state::camera_state::{Camera, Projection};
/// use blockscape::engine_state::config::{EngineConfig, WorldDimensions};
/// use blockscape::engine_state::rendering::CountingSink;
/// use blockscape::engine_state::voxels::terrain::generation::TerrainSource;
/// use blockscape::engine_state::EngineState;
/// use cgmath::Deg;
/// use web_time::Duration;
///
/// let config = EngineConfig {
///     dimensions: WorldDimensions::new(64, 32, 64),
///     terrain_source: TerrainSource::Flat,
///     ..Default::default()
/// };
/// let mut engine = EngineState::new(config).unwrap();
/// let camera = Camera::new(
///     (8.0, 4.0, 8.0),
///     Deg(0.0),
///     Deg(-20.0),
///     Projection::new(800, 600, Deg(45.0), 0.1, 200.0),
/// );
/// let mut sink = CountingSink::new();
/// engine.step(Duration::ZERO, &camera, &mut sink);
/// assert!(engine.renderer().is_allocated(0, 0));
/// ```
pub struct EngineState {
    config: EngineConfig,
    terrain: Terrain,
    sim: SimulationContext,
    renderer: ChunkMeshRenderer,
    last_viewer_pos: Option<Point3<f32>>,
}

impl EngineState {
    /// Validates `config`, generates the terrain it names and sets up the renderer.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let mut terrain = Terrain::new(config.dimensions);
        terrain.generate(config.terrain_source, config.seed);
        Self::with_terrain(config, terrain)
    }

    /// Builds an engine around an existing terrain.
    ///
    /// # Returns
    /// `InvalidDimensions` if the terrain's extents differ from the configured ones.
    pub fn with_terrain(config: EngineConfig, mut terrain: Terrain) -> EngineResult<Self> {
        config.validate()?;
        if terrain.dimensions() != config.dimensions {
            let dims = terrain.dimensions();
            return Err(EngineError::InvalidDimensions(format!(
                "terrain is {}x{}x{} but the configuration asks for {}x{}x{}",
                dims.x,
                dims.y,
                dims.z,
                config.dimensions.x,
                config.dimensions.y,
                config.dimensions.z
            )));
        }

        let sim = SimulationContext::new(&config);
        let renderer = ChunkMeshRenderer::new(&config, &mut terrain, &sim, Duration::ZERO);
        log::info!(
            "Engine ready: {}x{} chunks, view distance {}",
            config.chunks_x(),
            config.chunks_z(),
            config.view_distance()
        );
        Ok(Self {
            config,
            terrain,
            sim,
            renderer,
            last_viewer_pos: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Mutable terrain access for edits. Changes reach the renderer on the next `step`.
    pub fn terrain_mut(&mut self) -> &mut Terrain {
        &mut self.terrain
    }

    pub fn simulation(&self) -> &SimulationContext {
        &self.sim
    }

    pub fn simulation_mut(&mut self) -> &mut SimulationContext {
        &mut self.sim
    }

    pub fn renderer(&self) -> &ChunkMeshRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut ChunkMeshRenderer {
        &mut self.renderer
    }

    /// Runs one frame.
    ///
    /// # Arguments
    /// * `now` - Time since engine start
    /// * `camera` - The viewer
    /// * `sink` - Receives the frame's geometry
    pub fn step<C: CameraView + ?Sized>(
        &mut self,
        now: Duration,
        camera: &C,
        sink: &mut dyn RenderSink,
    ) {
        if self.sim.update_daylight(now) {
            self.renderer.on_daylight_changed(self.sim.daylight(), sink);
        }

        let position = camera.position();
        let ctx = MeshingContext::new(&self.terrain, &self.sim, now);
        if self.last_viewer_pos != Some(position) {
            self.renderer.on_viewer_moved(position, &ctx);
            self.last_viewer_pos = Some(position);
        }
        self.renderer.render(camera, &ctx, sink);
    }

    /// Replaces the terrain with a freshly generated one and starts streaming over.
    pub fn regenerate(&mut self, source: TerrainSource, seed: u64, now: Duration) {
        self.terrain.generate(source, seed);
        self.restart(now);
    }

    /// Writes `<base>.terrain`, `<base>.edescr` and `<base>.entities`.
    pub fn save_world<P: AsRef<Path>>(&self, base: P) -> EngineResult<()> {
        self.terrain.save_terrain(terrain_file_path(base.as_ref()))?;
        self.terrain.save_entities(base)
    }

    /// Loads a world written by `save_world` and starts streaming over.
    ///
    /// The terrain file must exist; missing entity files leave the entities untouched.
    pub fn load_world<P: AsRef<Path>>(&mut self, base: P, now: Duration) -> EngineResult<()> {
        self.terrain.load_terrain(terrain_file_path(base.as_ref()))?;
        self.terrain.load_entities(base)?;
        self.restart(now);
        Ok(())
    }

    fn restart(&mut self, now: Duration) {
        self.sim.reset(now);
        let ctx = MeshingContext::new(&self.terrain, &self.sim, now);
        self.renderer.reset(&ctx);
        self.last_viewer_pos = None;
    }
}

/// Path of the terrain file for a world base name.
pub fn terrain_file_path(base: &Path) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_os_string();
    name.push(".");
    name.push(TERRAIN_EXTENSION);
    PathBuf::from(name)
}
