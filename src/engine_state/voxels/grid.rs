//! # Voxel Grid
//!
//! Dense storage for block ids. The grid keeps one flat byte array laid out as
//! `x * (Y * Z) + y * Z + z`, which is also the on-disk terrain layout.
//!
//! Every public access is bounds-checked. `get_in_bounds` skips the validity test for
//! callers that already iterate inside the grid, such as the mesh builder.

use crate::engine_state::config::WorldDimensions;
use crate::engine_state::error::{EngineError, EngineResult};
use crate::engine_state::voxels::block::{BlockId, EMPTY};

/// A fixed-extent three dimensional array of block ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
    dimensions: WorldDimensions,
    cells: Vec<BlockId>,
}

impl VoxelGrid {
    /// Creates an empty grid.
    pub fn new(dimensions: WorldDimensions) -> Self {
        Self {
            dimensions,
            cells: vec![EMPTY; dimensions.volume()],
        }
    }

    /// Creates a grid from raw bytes in storage order.
    ///
    /// # Returns
    /// `TerrainSizeMismatch` if `bytes` does not hold exactly one id per cell.
    pub fn from_bytes(dimensions: WorldDimensions, bytes: Vec<BlockId>) -> EngineResult<Self> {
        if bytes.len() != dimensions.volume() {
            return Err(EngineError::TerrainSizeMismatch {
                expected: dimensions.volume(),
                actual: bytes.len(),
            });
        }
        Ok(Self {
            dimensions,
            cells: bytes,
        })
    }

    /// Extents of the grid.
    pub fn dimensions(&self) -> WorldDimensions {
        self.dimensions
    }

    /// Returns `true` if the position lies inside the grid.
    #[inline]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.dimensions.x
            && (y as usize) < self.dimensions.y
            && (z as usize) < self.dimensions.z
    }

    /// Flat index of a position, or `None` outside the grid.
    #[inline]
    pub fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if self.contains(x, y, z) {
            Some(self.index_in_bounds(x as usize, y as usize, z as usize))
        } else {
            None
        }
    }

    #[inline]
    fn index_in_bounds(&self, x: usize, y: usize, z: usize) -> usize {
        x * (self.dimensions.y * self.dimensions.z) + y * self.dimensions.z + z
    }

    /// Block id at a position, or `None` outside the grid.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        self.index(x, y, z).map(|i| self.cells[i])
    }

    /// Block id at a position, or `EMPTY` outside the grid.
    #[inline]
    pub fn get_or_default(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.get(x, y, z).unwrap_or(EMPTY)
    }

    /// Block id at a position the caller knows to be inside the grid.
    ///
    /// Only debug builds verify the position; release builds rely on the slice bound
    /// check of the flat array.
    #[inline]
    pub fn get_in_bounds(&self, x: usize, y: usize, z: usize) -> BlockId {
        debug_assert!(
            x < self.dimensions.x && y < self.dimensions.y && z < self.dimensions.z,
            "({x}, {y}, {z}) is outside the grid"
        );
        self.cells[self.index_in_bounds(x, y, z)]
    }

    /// Writes a block id.
    ///
    /// # Returns
    /// `OutOfBounds` without touching the grid if the position is outside it.
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> EngineResult<()> {
        let index = self
            .index(x, y, z)
            .ok_or(EngineError::OutOfBounds { x, y, z })?;
        self.cells[index] = id;
        Ok(())
    }

    /// Overwrites every cell with `id`.
    pub fn fill(&mut self, id: BlockId) {
        self.cells.fill(id);
    }

    /// The raw cells in storage order.
    pub fn as_bytes(&self) -> &[BlockId] {
        &self.cells
    }

    /// Number of cells holding `id`.
    pub fn count(&self, id: BlockId) -> usize {
        self.cells.iter().filter(|cell| **cell == id).count()
    }
}
