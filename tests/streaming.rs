use blockscape::engine_state::camera_state::{Camera, Projection};
use blockscape::engine_state::config::{DetailLevel, EngineConfig, WorldDimensions};
use blockscape::engine_state::rendering::{
    ChunkFootprint, ChunkIndex, ChunkMesh, CountingSink, MeshingContext,
};
use blockscape::engine_state::simulation::SimulationContext;
use blockscape::engine_state::voxels::terrain::generation::TerrainSource;
use blockscape::engine_state::voxels::terrain::Terrain;
use blockscape::engine_state::EngineState;
use cgmath::{Deg, Point3};
use web_time::Duration;

fn streaming_config(detail: DetailLevel, budget: usize) -> EngineConfig {
    EngineConfig {
        dimensions: WorldDimensions::new(160, 32, 160),
        detail,
        max_chunk_updates: budget,
        startup_burst_ms: 0,
        terrain_source: TerrainSource::Flat,
        no_night: true,
        ..Default::default()
    }
}

fn camera_at(x: f32, z: f32) -> Camera {
    Camera::new(
        (x, 6.0, z),
        Deg(0.0),
        Deg(-10.0),
        Projection::new(800, 600, Deg(45.0), 0.1, 300.0),
    )
}

fn expected_chunks(viewer: ChunkIndex, distance: i32, chunks: i32) -> Vec<ChunkIndex> {
    let mut out = Vec::new();
    for x in 0..chunks {
        for z in 0..chunks {
            let c = ChunkIndex::new(x, z);
            if c.distance(viewer) <= distance {
                out.push(c);
            }
        }
    }
    out
}

#[test]
fn budget_is_never_exceeded_while_walking() {
    let config = streaming_config(DetailLevel::Low, 2);
    let interval = config.chunk_update_interval();
    let mut engine = EngineState::new(config).unwrap();
    let mut sink = CountingSink::new();
    let mut camera = camera_at(8.0, 80.0);

    let frame = Duration::from_millis(50);
    let mut now = Duration::ZERO;
    let mut last_ops = 0;
    for step in 0..600 {
        camera.set_position(Point3::new(8.0 + step as f32 * 0.25, 6.0, 80.0));
        engine.step(now, &camera, &mut sink);

        let stats = engine.renderer().stats();
        let ops = stats.allocations + stats.frees;
        assert!(engine.renderer().changes_in_interval() <= 2);
        assert!(ops - last_ops <= 2, "frame {step} executed {} operations", ops - last_ops);
        last_ops = ops;
        now += frame;
    }

    let intervals = (now.as_millis() / interval.as_millis()) as usize + 1;
    assert!(last_ops <= intervals * 2);
    assert!(last_ops > 0);
}

#[test]
fn walking_one_chunk_at_a_time_converges_to_the_ring() {
    let config = streaming_config(DetailLevel::Low, 1);
    let distance = config.view_distance();
    let mut engine = EngineState::new(config).unwrap();
    let mut sink = CountingSink::new();
    let mut now = Duration::ZERO;
    let second = Duration::from_millis(1000);

    // cross the world along x, stopping in every chunk until it settles
    for chunk_x in 0..10 {
        let camera = camera_at(chunk_x as f32 * 16.0 + 8.0, 72.0);
        for _ in 0..40 {
            engine.step(now, &camera, &mut sink);
            now += second;
        }

        let viewer = ChunkIndex::new(chunk_x, 4);
        let mut allocated = engine.renderer().allocated_chunks();
        allocated.sort_by_key(|c| (c.x, c.z));
        assert_eq!(
            allocated,
            expected_chunks(viewer, distance, 10),
            "viewer in chunk {chunk_x}"
        );
    }
    assert_eq!(engine.renderer().pending_allocations(), 0);
}

#[test]
fn keep_meshes_never_streams() {
    let mut config = streaming_config(DetailLevel::VeryLow, 1);
    config.dimensions = WorldDimensions::new(64, 32, 64);
    config.keep_meshes = true;
    let mut engine = EngineState::new(config).unwrap();
    assert_eq!(engine.renderer().allocated_count(), 16);

    let mut sink = CountingSink::new();
    for (i, x) in [8.0, 24.0, 40.0, 56.0].into_iter().enumerate() {
        engine.step(
            Duration::from_millis(i as u64 * 1000),
            &camera_at(x, 8.0),
            &mut sink,
        );
    }
    let stats = engine.renderer().stats();
    assert_eq!(stats.allocations + stats.frees + stats.forced_allocations, 0);
    assert_eq!(engine.renderer().allocated_count(), 16);
}

#[test]
fn repeated_updates_produce_identical_meshes() {
    let dims = WorldDimensions::new(32, 32, 32);
    let mut terrain = Terrain::new(dims);
    terrain.generate_random(3);
    let config = EngineConfig {
        dimensions: dims,
        ..Default::default()
    };
    let sim = SimulationContext::new(&config);
    let ctx = MeshingContext::new(&terrain, &sim, Duration::ZERO);
    let mut scratch = Vec::new();

    let mut mesh = ChunkMesh::new(
        ChunkFootprint::for_chunk(1, 0, 16),
        16,
        2,
        Duration::from_millis(1000),
    );
    mesh.update(Some(16), &ctx, &mut scratch);
    let first: Vec<_> = (0..2)
        .map(|b| mesh.band(b).map(|s| s.vertices().to_vec()))
        .collect();
    mesh.update(Some(16), &ctx, &mut scratch);
    let second: Vec<_> = (0..2)
        .map(|b| mesh.band(b).map(|s| s.vertices().to_vec()))
        .collect();

    // y = 16 is the lowest layer of band 1, so band 0 is rebuilt too
    assert!(first.iter().all(Option::is_some));
    assert_eq!(first, second);
}

#[test]
fn engine_round_trips_a_world() {
    let config = streaming_config(DetailLevel::VeryLow, 1);
    let mut engine = EngineState::new(config.clone()).unwrap();
    engine.terrain_mut().set(3, 10, 3, 9).unwrap();

    let base = std::env::temp_dir().join(format!("blockscape-world-{}", std::process::id()));
    engine.save_world(&base).unwrap();

    let mut other = EngineState::new(EngineConfig {
        terrain_source: TerrainSource::Empty,
        ..config
    })
    .unwrap();
    other.load_world(&base, Duration::ZERO).unwrap();
    assert_eq!(other.terrain().get(3, 10, 3), Some(9));
    assert_eq!(other.terrain().grid().as_bytes(), engine.terrain().grid().as_bytes());

    let terrain_path = blockscape::engine_state::terrain_file_path(&base);
    let _ = std::fs::remove_file(terrain_path);
    let (count_path, data_path) =
        blockscape::engine_state::voxels::terrain::persistence::entity_file_paths(&base);
    let _ = std::fs::remove_file(count_path);
    let _ = std::fs::remove_file(data_path);
}
