//! Mesh generation and chunk streaming.
//!
//! The world is split into square chunks of `chunk_size` columns, and every chunk into
//! vertical bands of `chunk_size` blocks.
//!
//! # Architecture
//! - `ChunkMesh`: Face-culled block geometry of one chunk, one submesh per band
//! - `EntityBatch`: Geometry of all decorative entities anchored in one chunk
//! - `ChunkMeshRenderer`: Owns the per-chunk slots, streams them in and out around the
//!   viewer under a per-interval budget and drives the frame's draw order
//!
//! Mesh builders never keep their own staging memory. The renderer owns one vertex scratch
//! buffer and lends it to every build, which then copies the finished vertices into the
//! submesh it replaces.

mod chunk_mesh;
mod entity_batch;
mod renderer;

pub use chunk_mesh::*;
pub use entity_batch::*;
pub use renderer::*;

/// Horizontal extent of one chunk, in blocks. Bounds are half-open.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkFootprint {
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl ChunkFootprint {
    /// The footprint of chunk `(chunk_x, chunk_z)`.
    pub fn for_chunk(chunk_x: i32, chunk_z: i32, chunk_size: i32) -> Self {
        Self {
            min_x: chunk_x * chunk_size,
            max_x: (chunk_x + 1) * chunk_size,
            min_z: chunk_z * chunk_size,
            max_z: (chunk_z + 1) * chunk_size,
        }
    }

    /// Returns `true` if column `(x, z)` lies in the footprint.
    pub fn contains_column(&self, x: i32, z: i32) -> bool {
        (self.min_x..self.max_x).contains(&x) && (self.min_z..self.max_z).contains(&z)
    }
}
