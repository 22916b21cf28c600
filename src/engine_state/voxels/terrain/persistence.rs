//! # Terrain Persistence
//!
//! On-disk layout:
//! - Terrain file: the raw grid, one byte per cell in grid storage order.
//! - `<base>.edescr`: the number of entity records as a little-endian `i32`.
//! - `<base>.entities`: that many 20-byte records of little-endian `i32` fields
//!   `x, y, z, kind, face`.

use std::fs;
use std::path::{Path, PathBuf};

use cgmath::Point3;

use super::Terrain;
use crate::engine_state::error::{EngineError, EngineResult};
use crate::engine_state::voxels::block::CubeFace;
use crate::engine_state::voxels::entity::{Entity, EntityKind};
use crate::engine_state::voxels::grid::VoxelGrid;

/// Default terrain file name.
pub const DEFAULT_TERRAIN_FILE: &str = "terrain.dump";

/// Size of one encoded entity record in bytes.
pub const ENTITY_RECORD_SIZE: usize = 20;

const ENTITY_COUNT_EXTENSION: &str = "edescr";
const ENTITY_DATA_EXTENSION: &str = "entities";

/// Paths of the entity count and data files for a base name.
pub fn entity_file_paths<P: AsRef<Path>>(base: P) -> (PathBuf, PathBuf) {
    let base = base.as_ref();
    let with_extension = |extension: &str| {
        let mut name = base.as_os_str().to_os_string();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    };
    (
        with_extension(ENTITY_COUNT_EXTENSION),
        with_extension(ENTITY_DATA_EXTENSION),
    )
}

fn encode_entity(entity: &Entity, out: &mut Vec<u8>) {
    for field in [
        entity.pos.x,
        entity.pos.y,
        entity.pos.z,
        entity.kind as i32,
        entity.face as i32,
    ] {
        out.extend_from_slice(&field.to_le_bytes());
    }
}

fn decode_entity(index: usize, record: &[u8]) -> EngineResult<Entity> {
    let field = |i: usize| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&record[i * 4..i * 4 + 4]);
        i32::from_le_bytes(bytes)
    };
    let kind = EntityKind::from_index(field(3)).ok_or_else(|| EngineError::CorruptEntityRecord {
        index,
        reason: format!("unknown entity kind {}", field(3)),
    })?;
    let face = CubeFace::from_index(field(4)).ok_or_else(|| EngineError::CorruptEntityRecord {
        index,
        reason: format!("unknown cube face {}", field(4)),
    })?;
    Ok(Entity::new(Point3::new(field(0), field(1), field(2)), kind, face))
}

impl Terrain {
    /// Writes the raw grid to `path`.
    pub fn save_terrain<P: AsRef<Path>>(&self, path: P) -> EngineResult<()> {
        let bytes = self.grid.as_bytes();
        fs::write(path.as_ref(), bytes)?;
        log::info!(
            "Saved terrain ({} bytes) to {}",
            bytes.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Replaces the grid with the contents of a terrain file. Subscribers are not notified;
    /// the whole world has to be re-meshed after a load.
    ///
    /// # Returns
    /// `TerrainSizeMismatch` if the file does not hold exactly one byte per cell.
    pub fn load_terrain<P: AsRef<Path>>(&mut self, path: P) -> EngineResult<()> {
        let bytes = fs::read(path.as_ref())?;
        let len = bytes.len();
        self.grid = VoxelGrid::from_bytes(self.dimensions(), bytes)?;
        log::info!("Loaded terrain ({} bytes) from {}", len, path.as_ref().display());
        Ok(())
    }

    /// Writes the entity count and data files for `base`.
    pub fn save_entities<P: AsRef<Path>>(&self, base: P) -> EngineResult<()> {
        let (count_path, data_path) = entity_file_paths(base);
        let count = i32::try_from(self.entities.len()).map_err(|_| EngineError::CorruptEntityRecord {
            index: self.entities.len(),
            reason: "too many entities for the count file".to_string(),
        })?;

        let mut data = Vec::with_capacity(self.entities.len() * ENTITY_RECORD_SIZE);
        for entity in &self.entities {
            encode_entity(entity, &mut data);
        }
        fs::write(&count_path, count.to_le_bytes())?;
        fs::write(&data_path, &data)?;
        log::info!("Saved {} entities to {}", count, data_path.display());
        Ok(())
    }

    /// Replaces the entities with the ones stored for `base`, inserting them through
    /// `add_entity` so subscribers see every restored entity.
    ///
    /// # Returns
    /// `false` without touching the terrain if either file is missing.
    pub fn load_entities<P: AsRef<Path>>(&mut self, base: P) -> EngineResult<bool> {
        let (count_path, data_path) = entity_file_paths(base);
        if !count_path.exists() || !data_path.exists() {
            log::debug!("No entity files at {}, nothing to load", data_path.display());
            return Ok(false);
        }

        let count_bytes = fs::read(&count_path)?;
        let count_bytes: [u8; 4] = count_bytes
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| EngineError::CorruptEntityRecord {
                index: 0,
                reason: "entity count file is shorter than four bytes".to_string(),
            })?;
        let count = usize::try_from(i32::from_le_bytes(count_bytes)).map_err(|_| {
            EngineError::CorruptEntityRecord {
                index: 0,
                reason: "negative entity count".to_string(),
            }
        })?;

        let needed = count.checked_mul(ENTITY_RECORD_SIZE).ok_or_else(|| {
            EngineError::CorruptEntityRecord {
                index: 0,
                reason: format!("entity count {} overflows the data size", count),
            }
        })?;

        let data = fs::read(&data_path)?;
        if data.len() < needed {
            return Err(EngineError::CorruptEntityRecord {
                index: data.len() / ENTITY_RECORD_SIZE,
                reason: format!(
                    "data file holds {} bytes, {} records need {}",
                    data.len(),
                    count,
                    needed
                ),
            });
        }

        let restored = data
            .chunks_exact(ENTITY_RECORD_SIZE)
            .take(count)
            .enumerate()
            .map(|(i, record)| decode_entity(i, record))
            .collect::<EngineResult<Vec<_>>>()?;

        self.entities.clear();
        self.last_entity = None;
        for entity in restored {
            self.add_entity(entity);
        }
        log::info!("Loaded {} entities from {}", count, data_path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::config::WorldDimensions;

    fn temp_base(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("blockscape_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_record_layout_is_little_endian() {
        let entity = Entity::new(Point3::new(1, -2, 300), EntityKind::DOOR_Z, CubeFace::RIGHT);
        let mut bytes = Vec::new();
        encode_entity(&entity, &mut bytes);
        assert_eq!(bytes.len(), ENTITY_RECORD_SIZE);
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(&bytes[8..12], &[44, 1, 0, 0]);
        assert_eq!(&bytes[12..16], &[8, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &[3, 0, 0, 0]);

        let decoded = decode_entity(0, &bytes).unwrap();
        assert_eq!(decoded.pos, entity.pos);
        assert_eq!(decoded.kind, EntityKind::DOOR_Z);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut bytes = Vec::new();
        encode_entity(
            &Entity::new(Point3::new(0, 0, 0), EntityKind::LADDER, CubeFace::TOP),
            &mut bytes,
        );
        bytes[12] = 42;
        assert!(matches!(
            decode_entity(3, &bytes),
            Err(EngineError::CorruptEntityRecord { index: 3, .. })
        ));
    }

    #[test]
    fn test_missing_entity_files_load_nothing() {
        let mut terrain = Terrain::new(WorldDimensions::new(16, 16, 16));
        terrain.add_entity(Entity::new(Point3::new(1, 1, 1), EntityKind::GLASS, CubeFace::TOP));
        let loaded = terrain.load_entities(temp_base("missing")).unwrap();
        assert!(!loaded);
        assert_eq!(terrain.entities().len(), 1, "state is left untouched");
    }

    #[test]
    fn test_wrong_terrain_size_is_rejected() {
        let path = temp_base("short_terrain");
        fs::write(&path, [0u8; 10]).unwrap();
        let mut terrain = Terrain::new(WorldDimensions::new(16, 16, 16));
        let result = terrain.load_terrain(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(
            result,
            Err(EngineError::TerrainSizeMismatch {
                expected: 4096,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_huge_entity_count_is_rejected() {
        let base = temp_base("huge_count");
        let (count_path, data_path) = entity_file_paths(&base);
        fs::write(&count_path, i32::MAX.to_le_bytes()).unwrap();
        fs::write(&data_path, [0u8; 40]).unwrap();

        let mut terrain = Terrain::new(WorldDimensions::new(16, 16, 16));
        terrain.add_entity(Entity::new(Point3::new(1, 1, 1), EntityKind::GLASS, CubeFace::TOP));
        let result = terrain.load_entities(&base);
        fs::remove_file(&count_path).ok();
        fs::remove_file(&data_path).ok();

        assert!(matches!(result, Err(EngineError::CorruptEntityRecord { .. })));
        assert_eq!(terrain.entities().len(), 1);
    }

    #[test]
    fn test_entity_file_names() {
        let (count, data) = entity_file_paths("world/save1");
        assert_eq!(count, PathBuf::from("world/save1.edescr"));
        assert_eq!(data, PathBuf::from("world/save1.entities"));
    }
}
