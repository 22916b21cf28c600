//! # Entity Batch
//!
//! Geometry of every decorative entity anchored in one chunk, rebuilt as a whole whenever
//! an entity in the chunk changes or the daylight shifts.
//!
//! Shapes per kind:
//! - flora and standing torches: four quads crossing in the middle of the cell
//! - doors: a lower and an upper quad on each side of the door leaf
//! - glass: all six faces of the cell
//! - rails: one quad slightly above the top face, textured by the `RailTextureSource`
//! - everything else: one quad on the face the entity is mounted on

use cgmath::Point3;

use super::{ChunkFootprint, MeshingContext};
use crate::engine_state::rendering::cube_vertices::{push_face, TexCell, VERTICES_PER_QUAD};
use crate::engine_state::rendering::{RailTextureSource, RenderSink, Vertex};
use crate::engine_state::voxels::block::CubeFace;
use crate::engine_state::voxels::entity::{Entity, EntityKind, ENTITY_TEXTURE_COL};

/// Atlas row of the lower door half.
const DOOR_LOWER_ROW: u8 = 1;
/// Atlas row of the upper door half.
const DOOR_UPPER_ROW: u8 = 0;
/// Height of rails above their anchor block's top face.
const RAIL_LIFT: f32 = 0.1;

/// Entity geometry of one chunk.
#[derive(Debug)]
pub struct EntityBatch {
    footprint: ChunkFootprint,
    vertices: Vec<Vertex>,
    empty: bool,
}

impl EntityBatch {
    /// Creates an empty batch; call `update` to fill it.
    pub fn new(footprint: ChunkFootprint) -> Self {
        Self {
            footprint,
            vertices: Vec::new(),
            empty: true,
        }
    }

    pub fn footprint(&self) -> ChunkFootprint {
        self.footprint
    }

    /// Returns `true` if the chunk holds no entity as of the last update.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Draws the batch unless it is empty.
    pub fn render(&self, sink: &mut dyn RenderSink) {
        if !self.empty {
            sink.draw(&self.vertices);
        }
    }

    /// Rebuilds the batch from the entities currently in the footprint.
    ///
    /// # Panics
    /// If the emitted vertex count differs from the one derived from the entity counts.
    pub fn update(
        &mut self,
        ctx: &MeshingContext,
        rails: &dyn RailTextureSource,
        scratch: &mut Vec<Vertex>,
    ) {
        let f = self.footprint;
        let (entities, counts) = ctx
            .terrain
            .entities_in_area(f.min_x, f.max_x, f.min_z, f.max_z);

        if entities.is_empty() {
            self.vertices = Vec::new();
            self.empty = true;
            return;
        }

        let quads = entities.len() + counts.glass * 5 + counts.standing * 3 + counts.doors * 3;
        let expected = quads * VERTICES_PER_QUAD;

        scratch.clear();
        scratch.reserve(expected);
        for entity in &entities {
            Self::add_entity(ctx, rails, entity, scratch);
        }

        assert_eq!(
            scratch.len(),
            expected,
            "entity batch at ({}, {}) emitted a different vertex count than counted",
            f.min_x,
            f.min_z
        );

        self.vertices = scratch.as_slice().to_vec();
        self.empty = false;
    }

    /// Brightness of an entity: halved under cover, scaled by daylight. Torches glow at
    /// full brightness.
    pub fn entity_brightness(ctx: &MeshingContext, entity: &Entity) -> f32 {
        let terrain = ctx.terrain;
        let Point3 { x, y, z } = entity.pos;

        match entity.kind {
            EntityKind::TORCH => 1.0,
            EntityKind::GLASS => {
                let shade = if terrain.is_block_above(x, y, z) { 0.5 } else { 1.0 };
                shade * ctx.sim.daylight()
            }
            kind => {
                // wall-mounted entities take their shade from the cell they face
                let (nx, nz) = if kind.is_door() {
                    (0, 0)
                } else {
                    match entity.face {
                        CubeFace::FRONT => (0, 1),
                        CubeFace::BACK => (0, -1),
                        CubeFace::LEFT => (-1, 0),
                        CubeFace::RIGHT => (1, 0),
                        CubeFace::BOTTOM | CubeFace::TOP => (0, 0),
                    }
                };
                let shade = if terrain.is_block_above(x + nx, y, z + nz) {
                    0.5
                } else {
                    1.0
                };
                shade * ctx.sim.daylight()
            }
        }
    }

    fn add_entity(
        ctx: &MeshingContext,
        rails: &dyn RailTextureSource,
        entity: &Entity,
        out: &mut Vec<Vertex>,
    ) {
        let brightness = Self::entity_brightness(ctx, entity);
        let origin = [entity.pos.x as f32, entity.pos.y as f32, entity.pos.z as f32];
        let cell = TexCell::new(entity.kind.texture_row(), ENTITY_TEXTURE_COL);

        let quad = |out: &mut Vec<Vertex>, face: CubeFace, cell: TexCell, offset: [f32; 3]| {
            let offset = [origin[0] + offset[0], origin[1] + offset[1], origin[2] + offset[2]];
            push_face(out, face, cell, 1.0, false, offset, brightness);
        };

        let lower = TexCell::new(DOOR_LOWER_ROW, ENTITY_TEXTURE_COL);
        let upper = TexCell::new(DOOR_UPPER_ROW, ENTITY_TEXTURE_COL);

        match entity.kind {
            _ if entity.is_standing() => {
                quad(out, CubeFace::LEFT, cell, [0.5, 0.0, 0.0]);
                quad(out, CubeFace::RIGHT, cell, [-0.5, 0.0, 0.0]);
                quad(out, CubeFace::FRONT, cell, [0.0, 0.0, -0.5]);
                quad(out, CubeFace::BACK, cell, [0.0, 0.0, 0.5]);
            }
            EntityKind::DOOR_X | EntityKind::DOOR_Z_OPEN => {
                quad(out, CubeFace::LEFT, lower, [0.0, 0.0, 0.0]);
                quad(out, CubeFace::RIGHT, lower, [-1.0, 0.0, 0.0]);
                quad(out, CubeFace::LEFT, upper, [0.0, 1.0, 0.0]);
                quad(out, CubeFace::RIGHT, upper, [-1.0, 1.0, 0.0]);
            }
            EntityKind::DOOR_Z | EntityKind::DOOR_X_OPEN => {
                quad(out, CubeFace::FRONT, lower, [0.0, 0.0, -1.0]);
                quad(out, CubeFace::BACK, lower, [0.0, 0.0, 0.0]);
                quad(out, CubeFace::FRONT, upper, [0.0, 1.0, -1.0]);
                quad(out, CubeFace::BACK, upper, [0.0, 1.0, 0.0]);
            }
            EntityKind::GLASS => {
                for face in [
                    CubeFace::LEFT,
                    CubeFace::RIGHT,
                    CubeFace::TOP,
                    CubeFace::BOTTOM,
                    CubeFace::FRONT,
                    CubeFace::BACK,
                ] {
                    quad(out, face, cell, [0.0; 3]);
                }
            }
            EntityKind::RAIL => {
                let rail_cell = rails.rail_cell(ctx.terrain, entity.pos);
                quad(out, CubeFace::TOP, rail_cell, [0.0, RAIL_LIFT, 0.0]);
            }
            _ => quad(out, entity.face, cell, [0.0; 3]),
        }
    }
}
