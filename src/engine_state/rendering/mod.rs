//! Rendering system for the voxel engine.
//!
//! The core never talks to a graphics API. It produces flat triangle lists of `Vertex`
//! values and hands them to a `RenderSink`, the seam behind which a backend owns draw calls,
//! shader state and texture binding. Rail texturing depends on gameplay state the core does
//! not own, so it is delegated through `RailTextureSource`.

use cgmath::Point3;

pub mod cube_vertices;
pub mod meshing;
mod vertex;

// Re-export commonly used types
pub use meshing::{
    ChunkFootprint, ChunkIndex, ChunkMesh, ChunkMeshRenderer, EntityBatch, MeshingContext, SchedulerStats,
};
pub use vertex::Vertex;

use cube_vertices::TexCell;
use crate::engine_state::voxels::entity::{EntityKind, ENTITY_TEXTURE_COL};
use crate::engine_state::voxels::terrain::Terrain;

/// Receives the geometry of one frame.
///
/// Calls arrive in frame order: chunk meshes band by band, then, bracketed by
/// `begin_entity_pass` / `end_entity_pass`, the entity batches of every drawn chunk. The
/// entity pass is the only one that needs alpha testing and blending.
pub trait RenderSink {
    /// Draws a non-indexed triangle list.
    fn draw(&mut self, vertices: &[Vertex]);

    /// Enables alpha testing and blending for the entity batches.
    fn begin_entity_pass(&mut self) {}

    /// Restores opaque rendering after the entity batches.
    fn end_entity_pass(&mut self) {}

    /// Gives the host a chance to draw creatures standing in a drawn chunk.
    fn render_animals_in_chunk(&mut self, _chunk_x: i32, _chunk_z: i32) {}

    /// Called once whenever the global daylight factor changes.
    fn daylight_changed(&mut self, _factor: f32) {}
}

/// A sink that only counts what it is given. Used by the headless driver and by tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CountingSink {
    /// Number of `draw` calls.
    pub draw_calls: usize,
    /// Total vertices drawn.
    pub vertices: usize,
    /// `draw` calls made inside an entity pass.
    pub entity_draw_calls: usize,
    /// Number of entity passes begun.
    pub entity_passes: usize,
    /// Chunks handed to `render_animals_in_chunk`, in call order.
    pub animal_chunks: Vec<(i32, i32)>,
    /// The most recent daylight factor reported.
    pub daylight: Option<f32>,
    in_entity_pass: bool,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while between `begin_entity_pass` and `end_entity_pass`.
    pub fn in_entity_pass(&self) -> bool {
        self.in_entity_pass
    }
}

impl RenderSink for CountingSink {
    fn draw(&mut self, vertices: &[Vertex]) {
        self.draw_calls += 1;
        self.vertices += vertices.len();
        if self.in_entity_pass {
            self.entity_draw_calls += 1;
        }
    }

    fn begin_entity_pass(&mut self) {
        self.entity_passes += 1;
        self.in_entity_pass = true;
    }

    fn end_entity_pass(&mut self) {
        self.in_entity_pass = false;
    }

    fn render_animals_in_chunk(&mut self, chunk_x: i32, chunk_z: i32) {
        self.animal_chunks.push((chunk_x, chunk_z));
    }

    fn daylight_changed(&mut self, factor: f32) {
        self.daylight = Some(factor);
    }
}

/// Chooses the atlas cell of a rail from its neighbourhood (straight, curved, sloped).
pub trait RailTextureSource {
    fn rail_cell(&self, terrain: &Terrain, pos: Point3<i32>) -> TexCell;
}

/// Draws every rail with the plain rail texture.
#[derive(Copy, Clone, Debug, Default)]
pub struct UniformRails;

impl RailTextureSource for UniformRails {
    fn rail_cell(&self, _terrain: &Terrain, _pos: Point3<i32>) -> TexCell {
        TexCell::new(EntityKind::RAIL.texture_row(), ENTITY_TEXTURE_COL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_sink_tracks_entity_pass() {
        let mut sink = CountingSink::new();
        let quad = [Vertex::default(); 6];
        sink.draw(&quad);
        sink.begin_entity_pass();
        assert!(sink.in_entity_pass());
        sink.draw(&quad);
        sink.end_entity_pass();

        assert_eq!(sink.draw_calls, 2);
        assert_eq!(sink.vertices, 12);
        assert_eq!(sink.entity_draw_calls, 1);
        assert_eq!(sink.entity_passes, 1);
        assert!(!sink.in_entity_pass());
    }
}
