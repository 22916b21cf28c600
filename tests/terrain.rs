use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use blockscape::engine_state::config::WorldDimensions;
use blockscape::engine_state::error::EngineError;
use blockscape::engine_state::voxels::block::{CubeFace, INVISIBLE_DOOR};
use blockscape::engine_state::voxels::entity::{Entity, EntityKind};
use blockscape::engine_state::voxels::terrain::persistence::entity_file_paths;
use blockscape::engine_state::voxels::terrain::Terrain;
use cgmath::Point3;

fn temp_base(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("blockscape-{}-{}", name, std::process::id()))
}

fn entity_keys(terrain: &Terrain) -> HashSet<(i32, i32, i32, i32, usize)> {
    terrain
        .entities()
        .iter()
        .map(|e| (e.pos.x, e.pos.y, e.pos.z, e.kind as i32, e.face.index()))
        .collect()
}

#[test]
fn flat_generation_fills_two_layers() {
    let mut terrain = Terrain::new(WorldDimensions::new(256, 64, 256));
    terrain.set(10, 30, 10, 9).unwrap();
    terrain.generate_flat(5);

    for x in 0..256 {
        for z in 0..256 {
            assert_eq!(terrain.get(x, 0, z), Some(5), "floor at ({x}, {z})");
            assert_eq!(terrain.get(x, 1, z), Some(5), "second layer at ({x}, {z})");
            assert_eq!(terrain.get(x, 2, z), Some(0), "air at ({x}, {z})");
        }
    }
    assert_eq!(terrain.get(10, 30, 10), Some(0));
    assert_eq!(terrain.grid().count(5), 2 * 256 * 256);
}

#[test]
fn lazy_batch_notifies_once_per_position() {
    let mut terrain = Terrain::new(WorldDimensions::new(32, 16, 32));
    let changes = terrain.subscribe();
    terrain.lazy_set(1, 2, 3, 4).unwrap();
    terrain.lazy_set(4, 5, 6, 7).unwrap();
    terrain.lazy_set(7, 8, 9, 10).unwrap();
    assert!(changes.is_empty(), "lazy writes must not notify before the flush");

    assert_eq!(terrain.lazy_set_flush(), 3);
    let positions: Vec<Point3<i32>> = changes.drain().into_iter().map(|c| c.pos).collect();
    assert_eq!(
        positions,
        vec![Point3::new(1, 2, 3), Point3::new(4, 5, 6), Point3::new(7, 8, 9)]
    );
    assert_eq!(terrain.get(4, 5, 6), Some(7));

    assert_eq!(terrain.lazy_set_flush(), 0);
    assert!(changes.is_empty());
}

#[test]
fn out_of_range_writes_fail_without_side_effects() {
    let mut terrain = Terrain::new(WorldDimensions::new(16, 16, 16));
    let changes = terrain.subscribe();

    let err = terrain.set(16, 0, 0, 3).unwrap_err();
    assert!(matches!(err, EngineError::OutOfBounds { x: 16, y: 0, z: 0 }));
    assert!(terrain.lazy_set(0, -1, 0, 3).is_err());
    assert_eq!(terrain.lazy_set_flush(), 0);
    assert!(changes.is_empty());
    assert_eq!(terrain.get(16, 0, 0), None);
    assert_eq!(terrain.get_or_default(16, 0, 0), 0);
}

#[test]
fn door_removal_with_any_face() {
    let mut terrain = Terrain::new(WorldDimensions::new(16, 16, 16));
    terrain.add_entity(Entity::new(Point3::new(5, 3, 5), EntityKind::DOOR_X, CubeFace::TOP));

    assert!(terrain.remove_entity_at(5, 3, 5, None));
    assert!(terrain.entities_at(5, 3, 5, None).is_empty());
    assert!(!terrain.has_entities());
}

#[test]
fn visible_faces_follow_neighbours_and_boundary() {
    let dims = WorldDimensions::new(8, 8, 8);
    let mut terrain = Terrain::new(dims);
    terrain.generate_flat(3);
    for x in 0..8 {
        for z in 0..8 {
            for y in 2..8 {
                terrain.set(x, y, z, if (x + y + z) % 3 == 0 { 0 } else { 3 }).unwrap();
            }
        }
    }

    for x in 0..8 {
        for y in 0..8 {
            for z in 0..8 {
                let faces = terrain.determine_visible_faces(x, y, z);
                let open = |nx: i32, ny: i32, nz: i32| terrain.get(nx, ny, nz) == Some(0);
                assert_eq!(faces.left, x == 0 || open(x - 1, y, z));
                assert_eq!(faces.right, x == 7 || open(x + 1, y, z));
                assert_eq!(faces.bottom, y == 0 || open(x, y - 1, z));
                assert_eq!(faces.top, y == 7 || open(x, y + 1, z));
                assert_eq!(faces.back, z == 0 || open(x, y, z - 1));
                assert_eq!(faces.front, z == 7 || open(x, y, z + 1));
                // no mutation in between: same answer
                assert_eq!(faces, terrain.determine_visible_faces(x, y, z));
            }
        }
    }
}

#[test]
fn invisible_door_is_passable_only_when_open() {
    let mut terrain = Terrain::new(WorldDimensions::new(16, 16, 16));
    terrain.set(4, 2, 4, INVISIBLE_DOOR).unwrap();
    terrain.set(4, 3, 4, INVISIBLE_DOOR).unwrap();

    terrain.add_entity(Entity::new(Point3::new(4, 2, 4), EntityKind::DOOR_Z, CubeFace::TOP));
    assert!(!terrain.is_empty_pos(4, 2, 4));
    assert!(!terrain.is_empty_pos(4, 3, 4));

    terrain.remove_entity_at(4, 2, 4, None);
    terrain.add_entity(Entity::new(
        Point3::new(4, 2, 4),
        EntityKind::DOOR_Z_OPEN,
        CubeFace::TOP,
    ));
    assert!(terrain.is_empty_pos(4, 2, 4));
    assert!(terrain.is_empty_pos(4, 3, 4));
}

#[test]
fn save_and_load_round_trip() {
    let dims = WorldDimensions::new(32, 16, 32);
    let mut terrain = Terrain::new(dims);
    terrain.generate_random(7);
    terrain.add_entity(Entity::new(Point3::new(1, 9, 1), EntityKind::TORCH, CubeFace::TOP));
    terrain.add_entity(Entity::new(Point3::new(2, 9, 2), EntityKind::LADDER, CubeFace::LEFT));
    terrain.add_entity(Entity::new(Point3::new(30, 9, 3), EntityKind::DOOR_X_OPEN, CubeFace::TOP));

    let base = temp_base("round-trip");
    let terrain_path = base.with_extension("raw");
    terrain.save_terrain(&terrain_path).unwrap();
    terrain.save_entities(&base).unwrap();

    let mut loaded = Terrain::new(dims);
    loaded.load_terrain(&terrain_path).unwrap();
    assert!(loaded.load_entities(&base).unwrap());

    assert_eq!(loaded.grid().as_bytes(), terrain.grid().as_bytes());
    assert_eq!(entity_keys(&loaded), entity_keys(&terrain));

    let (count_path, data_path) = entity_file_paths(&base);
    assert_eq!(fs::metadata(&data_path).unwrap().len(), 3 * 20);
    for path in [terrain_path, count_path, data_path] {
        let _ = fs::remove_file(path);
    }
}

#[test]
fn loading_a_wrongly_sized_terrain_fails() {
    let path = temp_base("short").with_extension("raw");
    fs::write(&path, vec![1u8; 100]).unwrap();

    let mut terrain = Terrain::new(WorldDimensions::new(16, 16, 16));
    let err = terrain.load_terrain(&path).unwrap_err();
    assert!(matches!(
        err,
        EngineError::TerrainSizeMismatch {
            expected: 4096,
            actual: 100
        }
    ));
    let _ = fs::remove_file(path);
}

#[test]
fn missing_entity_files_are_not_an_error() {
    let mut terrain = Terrain::new(WorldDimensions::new(16, 16, 16));
    terrain.add_entity(Entity::new(Point3::new(1, 1, 1), EntityKind::FLOWER, CubeFace::TOP));
    assert!(!terrain.load_entities(temp_base("missing")).unwrap());
    assert_eq!(terrain.entities().len(), 1);
}
