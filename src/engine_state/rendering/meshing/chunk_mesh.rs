//! # Chunk Mesh
//!
//! Face-culled block geometry for one chunk, split into vertical bands that are built and
//! rebuilt independently.
//!
//! ## Lighting
//! Every face starts at full brightness and is
//! - halved if a shadow-casting block sits anywhere above the neighbour the face looks at,
//! - dimmed by a per-orientation constant (front/back most, then left/right, then bottom),
//! - multiplied by the global daylight factor.
//!
//! Each vertex is then raised to the torch light level if a torch is close enough. The two
//! are combined with `max`, so torch light never darkens and daylight never adds to it.
//!
//! ## Build discipline
//! A band build first counts the vertices it will emit, then emits them into the caller's
//! scratch buffer and asserts that both numbers agree before the band is replaced. A band is
//! therefore either absent or complete.

use web_time::Duration;

use cgmath::Point3;

use super::ChunkFootprint;
use crate::engine_state::camera_state::BoundingBox;
use crate::engine_state::rendering::cube_vertices::{
    translated_face_corners, TexCell, TexRect, QUAD_INDICES, VERTICES_PER_QUAD,
};
use crate::engine_state::rendering::{RenderSink, Vertex};
use crate::engine_state::simulation::SimulationContext;
use crate::engine_state::voxels::block::{self, CubeFace, VisibleFaces, FENCE, TEXTURES_PER_ROW};
use crate::engine_state::voxels::terrain::Terrain;

/// Torch light reaches this far, in blocks.
pub const MAX_LIGHT_DIST: f32 = 2.0;
/// Brightness factor of a face whose neighbour column is covered.
pub const FAKE_SHADOW: f32 = 0.5;
/// Dimming of faces looking along Z.
pub const FRONT_BACK_DIM: f32 = 0.4;
/// Dimming of faces looking along X.
pub const LEFT_RIGHT_DIM: f32 = 0.2;
/// Dimming of bottom faces.
pub const BOTTOM_DIM: f32 = 0.5;

/// Side texture of grass-topped blocks.
const GRASS_SIDE_CELL: TexCell = TexCell::new(1, 0);
/// Texture of the bare sides and bottom of grass blocks.
const DIRT_CELL: TexCell = TexCell::new(0, 1);
const FENCE_CELL: TexCell = TexCell::new(1, 1);

/// Read-only inputs of a mesh build.
#[derive(Copy, Clone)]
pub struct MeshingContext<'a> {
    pub terrain: &'a Terrain,
    pub sim: &'a SimulationContext,
    /// Time since engine start, recorded as the build time.
    pub now: Duration,
}

impl<'a> MeshingContext<'a> {
    pub fn new(terrain: &'a Terrain, sim: &'a SimulationContext, now: Duration) -> Self {
        Self { terrain, sim, now }
    }
}

/// Orientation dimming of a face.
pub fn face_dim(face: CubeFace) -> f32 {
    match face {
        CubeFace::FRONT | CubeFace::BACK => FRONT_BACK_DIM,
        CubeFace::LEFT | CubeFace::RIGHT => LEFT_RIGHT_DIM,
        CubeFace::BOTTOM => BOTTOM_DIM,
        CubeFace::TOP => 0.0,
    }
}

/// `FAKE_SHADOW` if a shadow-casting block exists above the position, else 1.
pub fn shadow_factor(terrain: &Terrain, x: i32, y: i32, z: i32) -> f32 {
    if terrain.is_block_above(x, y, z) {
        FAKE_SHADOW
    } else {
        1.0
    }
}

/// Brightness contributed by a torch at `distance`, or `None` beyond its reach.
pub fn torch_light(distance: f32) -> Option<f32> {
    (distance <= MAX_LIGHT_DIST).then(|| 1.0 - distance * distance / MAX_LIGHT_DIST * 0.25)
}

/// Final brightness of a block vertex.
///
/// # Arguments
/// * `face_brightness` - Shadow and orientation factor of the face
/// * `position` - World position of the vertex
pub fn vertex_brightness(
    terrain: &Terrain,
    daylight: f32,
    face_brightness: f32,
    position: [f32; 3],
) -> f32 {
    let lit = face_brightness * daylight;
    if !terrain.has_entities() {
        return lit;
    }
    let distance = terrain.distance_to_nearest_light(position[0], position[1], position[2]);
    match torch_light(distance) {
        Some(torch) => lit.max(torch),
        None => lit,
    }
}

/// One fence corner: position, unit UV and orientation dimming.
type FenceCorner = [f32; 6];

const PILLAR_QUADS: [[FenceCorner; 4]; 6] = [
    // front
    [
        [0.3, 0.0, 0.7, 0.0, 0.0, FRONT_BACK_DIM],
        [0.7, 0.0, 0.7, 1.0, 0.0, FRONT_BACK_DIM],
        [0.7, 1.0, 0.7, 1.0, 1.0, FRONT_BACK_DIM],
        [0.3, 1.0, 0.7, 0.0, 1.0, FRONT_BACK_DIM],
    ],
    // back
    [
        [0.7, 0.0, 0.3, 0.0, 0.0, FRONT_BACK_DIM],
        [0.3, 0.0, 0.3, 1.0, 0.0, FRONT_BACK_DIM],
        [0.3, 1.0, 0.3, 1.0, 1.0, FRONT_BACK_DIM],
        [0.7, 1.0, 0.3, 0.0, 1.0, FRONT_BACK_DIM],
    ],
    // left
    [
        [0.3, 0.0, 0.3, 0.0, 0.0, LEFT_RIGHT_DIM],
        [0.3, 0.0, 0.7, 1.0, 0.0, LEFT_RIGHT_DIM],
        [0.3, 1.0, 0.7, 1.0, 1.0, LEFT_RIGHT_DIM],
        [0.3, 1.0, 0.3, 0.0, 1.0, LEFT_RIGHT_DIM],
    ],
    // right
    [
        [0.7, 0.0, 0.7, 0.0, 0.0, LEFT_RIGHT_DIM],
        [0.7, 0.0, 0.3, 1.0, 0.0, LEFT_RIGHT_DIM],
        [0.7, 1.0, 0.3, 1.0, 1.0, LEFT_RIGHT_DIM],
        [0.7, 1.0, 0.7, 0.0, 1.0, LEFT_RIGHT_DIM],
    ],
    // top
    [
        [0.3, 1.0, 0.7, 0.0, 0.0, 0.0],
        [0.7, 1.0, 0.7, 1.0, 0.0, 0.0],
        [0.7, 1.0, 0.3, 1.0, 1.0, 0.0],
        [0.3, 1.0, 0.3, 0.0, 1.0, 0.0],
    ],
    // bottom
    [
        [0.3, 0.0, 0.3, 0.0, 0.0, BOTTOM_DIM],
        [0.7, 0.0, 0.3, 1.0, 0.0, BOTTOM_DIM],
        [0.7, 0.0, 0.7, 1.0, 1.0, BOTTOM_DIM],
        [0.3, 0.0, 0.7, 0.0, 1.0, BOTTOM_DIM],
    ],
];

const RAIL_TO_LEFT: [[FenceCorner; 4]; 4] = [
    // front
    [
        [0.0, 0.5, 0.7, 0.0, 0.0, FRONT_BACK_DIM],
        [0.3, 0.5, 0.7, 1.0, 0.0, FRONT_BACK_DIM],
        [0.3, 0.75, 0.7, 1.0, 1.0, FRONT_BACK_DIM],
        [0.0, 0.75, 0.7, 0.0, 1.0, FRONT_BACK_DIM],
    ],
    // back
    [
        [0.3, 0.5, 0.3, 0.0, 0.0, FRONT_BACK_DIM],
        [0.0, 0.5, 0.3, 1.0, 0.0, FRONT_BACK_DIM],
        [0.0, 0.75, 0.3, 1.0, 1.0, FRONT_BACK_DIM],
        [0.3, 0.75, 0.3, 0.0, 1.0, FRONT_BACK_DIM],
    ],
    // top
    [
        [0.0, 0.75, 0.7, 0.0, 0.0, 0.0],
        [0.3, 0.75, 0.7, 1.0, 0.0, 0.0],
        [0.3, 0.75, 0.3, 1.0, 1.0, 0.0],
        [0.0, 0.75, 0.3, 0.0, 1.0, 0.0],
    ],
    // bottom
    [
        [0.0, 0.5, 0.3, 0.0, 0.0, BOTTOM_DIM],
        [0.3, 0.5, 0.3, 1.0, 0.0, BOTTOM_DIM],
        [0.3, 0.5, 0.7, 1.0, 1.0, BOTTOM_DIM],
        [0.0, 0.5, 0.7, 0.0, 1.0, BOTTOM_DIM],
    ],
];

const RAIL_TO_RIGHT: [[FenceCorner; 4]; 4] = [
    // front
    [
        [0.7, 0.5, 0.7, 0.0, 0.0, FRONT_BACK_DIM],
        [1.0, 0.5, 0.7, 1.0, 0.0, FRONT_BACK_DIM],
        [1.0, 0.75, 0.7, 1.0, 1.0, FRONT_BACK_DIM],
        [0.7, 0.75, 0.7, 0.0, 1.0, FRONT_BACK_DIM],
    ],
    // back
    [
        [1.0, 0.5, 0.3, 0.0, 0.0, FRONT_BACK_DIM],
        [0.7, 0.5, 0.3, 1.0, 0.0, FRONT_BACK_DIM],
        [0.7, 0.75, 0.3, 1.0, 1.0, FRONT_BACK_DIM],
        [1.0, 0.75, 0.3, 0.0, 1.0, FRONT_BACK_DIM],
    ],
    // top
    [
        [0.7, 0.75, 0.7, 0.0, 0.0, 0.0],
        [1.0, 0.75, 0.7, 1.0, 0.0, 0.0],
        [1.0, 0.75, 0.3, 1.0, 1.0, 0.0],
        [0.7, 0.75, 0.3, 0.0, 1.0, 0.0],
    ],
    // bottom
    [
        [0.7, 0.5, 0.3, 0.0, 0.0, BOTTOM_DIM],
        [1.0, 0.5, 0.3, 1.0, 0.0, BOTTOM_DIM],
        [1.0, 0.5, 0.7, 1.0, 1.0, BOTTOM_DIM],
        [0.7, 0.5, 0.7, 0.0, 1.0, BOTTOM_DIM],
    ],
];

const RAIL_TO_BACK: [[FenceCorner; 4]; 4] = [
    // left
    [
        [0.3, 0.5, 0.0, 0.0, 0.0, LEFT_RIGHT_DIM],
        [0.3, 0.5, 0.3, 1.0, 0.0, LEFT_RIGHT_DIM],
        [0.3, 0.75, 0.3, 1.0, 1.0, LEFT_RIGHT_DIM],
        [0.3, 0.75, 0.0, 0.0, 1.0, LEFT_RIGHT_DIM],
    ],
    // right
    [
        [0.7, 0.5, 0.3, 0.0, 0.0, LEFT_RIGHT_DIM],
        [0.7, 0.5, 0.0, 1.0, 0.0, LEFT_RIGHT_DIM],
        [0.7, 0.75, 0.0, 1.0, 1.0, LEFT_RIGHT_DIM],
        [0.7, 0.75, 0.3, 0.0, 1.0, LEFT_RIGHT_DIM],
    ],
    // top
    [
        [0.3, 0.75, 0.3, 0.0, 0.0, 0.0],
        [0.7, 0.75, 0.3, 1.0, 0.0, 0.0],
        [0.7, 0.75, 0.0, 1.0, 1.0, 0.0],
        [0.3, 0.75, 0.0, 0.0, 1.0, 0.0],
    ],
    // bottom
    [
        [0.3, 0.5, 0.0, 0.0, 0.0, BOTTOM_DIM],
        [0.7, 0.5, 0.0, 1.0, 0.0, BOTTOM_DIM],
        [0.7, 0.5, 0.3, 1.0, 1.0, BOTTOM_DIM],
        [0.3, 0.5, 0.3, 0.0, 1.0, BOTTOM_DIM],
    ],
];

const RAIL_TO_FRONT: [[FenceCorner; 4]; 4] = [
    // left
    [
        [0.3, 0.5, 0.7, 0.0, 0.0, LEFT_RIGHT_DIM],
        [0.3, 0.5, 1.0, 1.0, 0.0, LEFT_RIGHT_DIM],
        [0.3, 0.75, 1.0, 1.0, 1.0, LEFT_RIGHT_DIM],
        [0.3, 0.75, 0.7, 0.0, 1.0, LEFT_RIGHT_DIM],
    ],
    // right
    [
        [0.7, 0.5, 1.0, 0.0, 0.0, LEFT_RIGHT_DIM],
        [0.7, 0.5, 0.7, 1.0, 0.0, LEFT_RIGHT_DIM],
        [0.7, 0.75, 0.7, 1.0, 1.0, LEFT_RIGHT_DIM],
        [0.7, 0.75, 1.0, 0.0, 1.0, LEFT_RIGHT_DIM],
    ],
    // top
    [
        [0.3, 0.75, 1.0, 0.0, 0.0, 0.0],
        [0.7, 0.75, 1.0, 1.0, 0.0, 0.0],
        [0.7, 0.75, 0.7, 1.0, 1.0, 0.0],
        [0.3, 0.75, 0.7, 0.0, 1.0, 0.0],
    ],
    // bottom
    [
        [0.3, 0.5, 0.7, 0.0, 0.0, BOTTOM_DIM],
        [0.7, 0.5, 0.7, 1.0, 0.0, BOTTOM_DIM],
        [0.7, 0.5, 1.0, 1.0, 1.0, BOTTOM_DIM],
        [0.3, 0.5, 1.0, 0.0, 1.0, BOTTOM_DIM],
    ],
];

/// Rails towards the left, right, back and front neighbour, with the offset to that neighbour.
const FENCE_RAILS: [(i32, i32, &[[FenceCorner; 4]; 4]); 4] = [
    (-1, 0, &RAIL_TO_LEFT),
    (1, 0, &RAIL_TO_RIGHT),
    (0, -1, &RAIL_TO_BACK),
    (0, 1, &RAIL_TO_FRONT),
];

const PILLAR_VERTICES: usize = 6 * VERTICES_PER_QUAD;
const RAIL_VERTICES: usize = 4 * VERTICES_PER_QUAD;

fn push_fence_quads(
    out: &mut Vec<Vertex>,
    quads: &[[FenceCorner; 4]],
    origin: [f32; 3],
    rect: &TexRect,
    brightness: f32,
) {
    for quad in quads {
        for corner in QUAD_INDICES {
            let [px, py, pz, u, v, dim] = quad[corner];
            let [u, v] = rect.lerp(u, v);
            out.push(Vertex::new(
                [px + origin[0], py + origin[1], pz + origin[2]],
                u,
                v,
                brightness * (1.0 - dim),
            ));
        }
    }
}

/// A fully built band.
#[derive(Clone, Debug)]
pub struct SubMesh {
    vertices: Vec<Vertex>,
    built_at: Duration,
}

impl SubMesh {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Time since engine start at which the band was built.
    pub fn built_at(&self) -> Duration {
        self.built_at
    }
}

/// Block geometry of one chunk.
#[derive(Debug)]
pub struct ChunkMesh {
    footprint: ChunkFootprint,
    band_height: i32,
    bands: Vec<Option<SubMesh>>,
    bbox: BoundingBox,
    build_cooldown: Duration,
    last_lazy_build: Option<Duration>,
}

impl ChunkMesh {
    /// Creates a chunk mesh with no band built.
    ///
    /// # Arguments
    /// * `footprint` - Columns covered by the chunk; must lie inside the terrain
    /// * `band_height` - Height of one band in blocks
    /// * `band_count` - Number of bands stacked from y = 0
    /// * `build_cooldown` - Minimum time between two lazy band builds in `render`
    pub fn new(
        footprint: ChunkFootprint,
        band_height: usize,
        band_count: usize,
        build_cooldown: Duration,
    ) -> Self {
        let height = (band_height * band_count) as f32;
        let bbox = BoundingBox::new(
            Point3::new(footprint.min_x as f32, 0.0, footprint.min_z as f32),
            Point3::new(footprint.max_x as f32, height, footprint.max_z as f32),
        );
        Self {
            footprint,
            band_height: band_height.max(1) as i32,
            bands: vec![None; band_count],
            bbox,
            build_cooldown,
            last_lazy_build: None,
        }
    }

    pub fn footprint(&self) -> ChunkFootprint {
        self.footprint
    }

    /// World-space box around the whole chunk column.
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Band containing height `y`, if any.
    pub fn band_of(&self, y: i32) -> Option<usize> {
        if y < 0 {
            return None;
        }
        let band = (y / self.band_height) as usize;
        (band < self.bands.len()).then_some(band)
    }

    pub fn band(&self, band: usize) -> Option<&SubMesh> {
        self.bands.get(band).and_then(|b| b.as_ref())
    }

    pub fn is_band_built(&self, band: usize) -> bool {
        self.band(band).is_some()
    }

    /// Number of bands currently built.
    pub fn built_bands(&self) -> usize {
        self.bands.iter().filter(|b| b.is_some()).count()
    }

    /// Vertices over all built bands.
    pub fn vertex_count(&self) -> usize {
        self.bands.iter().flatten().map(SubMesh::vertex_count).sum()
    }

    /// Builds every band. Used when meshes are kept for the whole world up front.
    pub fn build_all(&mut self, ctx: &MeshingContext, scratch: &mut Vec<Vertex>) {
        for band in 0..self.bands.len() {
            self.build_band(band, ctx, scratch);
        }
    }

    /// Rebuilds after a change at height `y`.
    ///
    /// `None` rebuilds every band that is already built. Otherwise the band containing `y`
    /// is built, together with the band below if `y` is its lowest layer or the band above
    /// if `y` is its highest, since faces and shadows on either side of a band boundary
    /// depend on blocks across it. Heights outside the grid are ignored.
    pub fn update(&mut self, y: Option<i32>, ctx: &MeshingContext, scratch: &mut Vec<Vertex>) {
        let Some(y) = y else {
            for band in 0..self.bands.len() {
                if self.bands[band].is_some() {
                    self.build_band(band, ctx, scratch);
                }
            }
            return;
        };

        let Some(band) = self.band_of(y) else {
            return;
        };
        self.build_band(band, ctx, scratch);

        let layer = y % self.band_height;
        if layer == 0 && band > 0 {
            self.build_band(band - 1, ctx, scratch);
        } else if layer == self.band_height - 1 && band + 1 < self.bands.len() {
            self.build_band(band + 1, ctx, scratch);
        }
    }

    /// Draws every built band in ascending order.
    ///
    /// A missing band is built on the spot, at most once per cooldown. The band containing
    /// the viewer takes precedence over the missing band the loop is looking at.
    pub fn render(
        &mut self,
        camera_y: i32,
        ctx: &MeshingContext,
        scratch: &mut Vec<Vertex>,
        sink: &mut dyn RenderSink,
    ) {
        for band in 0..self.bands.len() {
            if let Some(submesh) = &self.bands[band] {
                if !submesh.vertices.is_empty() {
                    sink.draw(&submesh.vertices);
                }
                continue;
            }

            if !self.lazy_build_due(ctx.now) {
                continue;
            }
            let camera_band = self.band_of(camera_y.max(0)).unwrap_or(self.bands.len() - 1);
            let target = if self.bands[camera_band].is_none() {
                camera_band
            } else {
                band
            };
            self.build_band(target, ctx, scratch);
            if let Some(submesh) = &self.bands[target] {
                if !submesh.vertices.is_empty() {
                    sink.draw(&submesh.vertices);
                }
            }
            self.last_lazy_build = Some(ctx.now);
        }
    }

    fn lazy_build_due(&self, now: Duration) -> bool {
        self.last_lazy_build
            .map_or(true, |last| now.saturating_sub(last) > self.build_cooldown)
    }

    /// Column and height ranges of a band, clipped to the grid.
    fn band_ranges(
        &self,
        terrain: &Terrain,
        band: usize,
    ) -> (std::ops::Range<i32>, std::ops::Range<i32>, std::ops::Range<i32>) {
        let dims = terrain.dimensions();
        let clip = |lo: i32, hi: i32, extent: usize| lo.max(0)..hi.min(extent as i32);
        let min_y = band as i32 * self.band_height;
        (
            clip(self.footprint.min_x, self.footprint.max_x, dims.x),
            clip(min_y, min_y + self.band_height, dims.y),
            clip(self.footprint.min_z, self.footprint.max_z, dims.z),
        )
    }

    fn count_band_vertices(&self, terrain: &Terrain, band: usize) -> usize {
        let grid = terrain.grid();
        let (xs, ys, zs) = self.band_ranges(terrain, band);
        let mut count = 0;
        for x in xs {
            for y in ys.clone() {
                for z in zs.clone() {
                    let id = grid.get_in_bounds(x as usize, y as usize, z as usize);
                    if id == block::EMPTY || block::is_invisible(id) {
                        continue;
                    }
                    if id == FENCE {
                        let rails = FENCE_RAILS
                            .iter()
                            .filter(|(dx, dz, _)| terrain.get_or_default(x + dx, y, z + dz) == FENCE)
                            .count();
                        count += PILLAR_VERTICES + rails * RAIL_VERTICES;
                    } else {
                        count += terrain.determine_visible_faces(x, y, z).count() * VERTICES_PER_QUAD;
                    }
                }
            }
        }
        count
    }

    /// Builds one band and replaces whatever it held.
    ///
    /// # Panics
    /// If the emitted vertex count differs from the counted one.
    pub fn build_band(&mut self, band: usize, ctx: &MeshingContext, scratch: &mut Vec<Vertex>) {
        if band >= self.bands.len() {
            return;
        }
        let terrain = ctx.terrain;
        let expected = self.count_band_vertices(terrain, band);

        scratch.clear();
        scratch.reserve(expected);

        let grid = terrain.grid();
        let (xs, ys, zs) = self.band_ranges(terrain, band);
        for x in xs {
            for y in ys.clone() {
                for z in zs.clone() {
                    let id = grid.get_in_bounds(x as usize, y as usize, z as usize);
                    Self::process_block(ctx, id, x, y, z, scratch);
                }
            }
        }

        assert_eq!(
            scratch.len(),
            expected,
            "band {} of chunk at ({}, {}) emitted a different vertex count than counted",
            band,
            self.footprint.min_x,
            self.footprint.min_z
        );

        self.bands[band] = Some(SubMesh {
            vertices: scratch.as_slice().to_vec(),
            built_at: ctx.now,
        });
    }

    fn process_block(ctx: &MeshingContext, id: u8, x: i32, y: i32, z: i32, out: &mut Vec<Vertex>) {
        if id == FENCE {
            Self::add_fence(ctx, x, y, z, out);
            return;
        }
        let Some(texture) = block::texture_of(id) else {
            return;
        };
        let faces = ctx.terrain.determine_visible_faces(x, y, z);
        if faces.any() {
            let cell = TexCell::new(texture / TEXTURES_PER_ROW, texture % TEXTURES_PER_ROW);
            Self::add_block(ctx, faces, x, y, z, cell, out);
        }
    }

    fn add_block(
        ctx: &MeshingContext,
        faces: VisibleFaces,
        x: i32,
        y: i32,
        z: i32,
        cell: TexCell,
        out: &mut Vec<Vertex>,
    ) {
        let terrain = ctx.terrain;
        let daylight = ctx.sim.daylight();
        let rect = TexRect::from_cell(cell);
        let corners = translated_face_corners(x as f32, y as f32, z as f32, &rect);
        // The first atlas cell is grass: its sides and bottom use other cells.
        let grass = rect.min_u == 0.0 && rect.min_v == 0.0;

        for face in CubeFace::all() {
            if !faces.is_visible(face) {
                continue;
            }
            let n = face.normal();
            let face_brightness =
                shadow_factor(terrain, x + n.x, y + n.y, z + n.z) * (1.0 - face_dim(face));

            let mut quad = corners[face.index()];
            if grass && face != CubeFace::TOP {
                let swap = if face.is_side() && faces.top {
                    GRASS_SIDE_CELL
                } else {
                    DIRT_CELL
                };
                let swap = TexRect::from_cell(swap);
                for (i, corner) in quad.iter_mut().enumerate() {
                    corner.uv = swap.corner_uv(i);
                }
            }

            let lit = quad.map(|c| vertex_brightness(terrain, daylight, face_brightness, c.position));
            for i in QUAD_INDICES {
                let [u, v] = quad[i].uv;
                out.push(Vertex::new(quad[i].position, u, v, lit[i]));
            }
        }
    }

    fn add_fence(ctx: &MeshingContext, x: i32, y: i32, z: i32, out: &mut Vec<Vertex>) {
        let terrain = ctx.terrain;
        let rect = TexRect::from_cell(FENCE_CELL);
        let brightness = ctx.sim.daylight() * shadow_factor(terrain, x, y, z);
        let origin = [x as f32, y as f32, z as f32];

        push_fence_quads(out, &PILLAR_QUADS, origin, &rect, brightness);
        for (dx, dz, rail) in FENCE_RAILS {
            if terrain.get_or_default(x + dx, y, z + dz) == FENCE {
                push_fence_quads(out, rail, origin, &rect, brightness);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::config::{EngineConfig, WorldDimensions};
    use crate::engine_state::rendering::cube_vertices::ATLAS_CELL;
    use crate::engine_state::rendering::CountingSink;
    use crate::engine_state::voxels::entity::{Entity, EntityKind};

    const STONE: u8 = 4;

    fn setup() -> (Terrain, SimulationContext, ChunkMesh) {
        let terrain = Terrain::new(WorldDimensions::new(16, 32, 16));
        let sim = SimulationContext::new(&EngineConfig::default());
        let mesh = ChunkMesh::new(
            ChunkFootprint::for_chunk(0, 0, 16),
            16,
            2,
            Duration::from_millis(1000),
        );
        (terrain, sim, mesh)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_single_block_emits_six_faces() {
        let (mut terrain, sim, mut mesh) = setup();
        terrain.set(5, 5, 5, STONE).unwrap();
        let mut scratch = Vec::new();
        mesh.build_band(0, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch);

        let band = mesh.band(0).unwrap();
        assert_eq!(band.vertex_count(), 36);

        // faces are emitted front, back, left, right, bottom, top
        let brightness: Vec<f32> = band.vertices().chunks(6).map(|q| q[0].brightness()).collect();
        assert!(approx(brightness[0], 0.6));
        assert!(approx(brightness[2], 0.8));
        assert!(approx(brightness[4], 0.5));
        assert!(approx(brightness[5], 1.0));
    }

    #[test]
    fn test_covered_neighbour_column_halves_brightness() {
        let (mut terrain, sim, mut mesh) = setup();
        terrain.set(5, 5, 5, STONE).unwrap();
        // roof over the cell in front of the block
        terrain.set(5, 9, 6, STONE).unwrap();
        let mut scratch = Vec::new();
        mesh.build_band(0, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch);

        let front = mesh.band(0).unwrap().vertices()[0];
        assert!(approx(front.brightness(), 0.5 * 0.6));
    }

    #[test]
    fn test_daylight_scales_faces() {
        let (mut terrain, mut sim, mut mesh) = setup();
        terrain.set(5, 5, 5, STONE).unwrap();
        sim.set_daylight(0.5);
        let mut scratch = Vec::new();
        mesh.build_band(0, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch);
        let top = mesh.band(0).unwrap().vertices()[30];
        assert!(approx(top.brightness(), 0.5));
    }

    #[test]
    fn test_torch_light_wins_over_darkness() {
        let (mut terrain, mut sim, mut mesh) = setup();
        terrain.set(5, 5, 5, STONE).unwrap();
        terrain.set(12, 5, 12, STONE).unwrap();
        terrain.add_entity(Entity::new(Point3::new(5, 6, 5), EntityKind::TORCH, CubeFace::TOP));
        sim.set_daylight(0.15);
        let mut scratch = Vec::new();
        mesh.build_band(0, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch);

        // first top corner sits at (6, 6, 6), half a diagonal away from the torch
        let top = mesh.band(0).unwrap().vertices()[30];
        assert_eq!(top.position, [6.0, 6.0, 6.0]);
        assert!(approx(top.brightness(), 1.0 - 0.5 / 2.0 * 0.25), "got {}", top.brightness());

        // a block out of the torch's reach keeps the plain daylight value
        let far_top = mesh.band(0).unwrap().vertices()[36 + 30];
        assert_eq!(far_top.position, [13.0, 6.0, 13.0]);
        assert!(approx(far_top.brightness(), 0.15));
    }

    #[test]
    fn test_grass_sides_use_side_and_dirt_cells() {
        let (mut terrain, sim, mut mesh) = setup();
        terrain.set(5, 5, 5, 1).unwrap();
        let mut scratch = Vec::new();
        mesh.build_band(0, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch);
        let vertices = mesh.band(0).unwrap().vertices();

        assert_eq!(vertices[0].tex_coords, [0.0, ATLAS_CELL]);
        assert_eq!(vertices[24].tex_coords, [ATLAS_CELL, 0.0]);
        assert_eq!(vertices[30].tex_coords, [0.0, 0.0]);

        // once covered, the sides fall back to dirt
        terrain.set(5, 6, 5, STONE).unwrap();
        mesh.build_band(0, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch);
        let vertices = mesh.band(0).unwrap().vertices();
        assert_eq!(vertices[0].tex_coords, [ATLAS_CELL, 0.0]);
    }

    #[test]
    fn test_fence_rails_connect_neighbours() {
        let (mut terrain, sim, mut mesh) = setup();
        terrain.set(3, 1, 3, FENCE).unwrap();
        terrain.set(4, 1, 3, FENCE).unwrap();
        let mut scratch = Vec::new();
        mesh.build_band(0, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch);
        assert_eq!(mesh.band(0).unwrap().vertex_count(), 2 * (36 + 24));
    }

    #[test]
    fn test_ghost_blocks_are_not_meshed() {
        let (mut terrain, sim, mut mesh) = setup();
        terrain.set(3, 1, 3, block::INVISIBLE_SOLID).unwrap();
        let mut scratch = Vec::new();
        mesh.build_band(0, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch);
        assert_eq!(mesh.band(0).unwrap().vertex_count(), 0);
    }

    #[test]
    fn test_update_on_band_boundary_builds_neighbour() {
        let (mut terrain, sim, mut mesh) = setup();
        terrain.set(2, 16, 2, STONE).unwrap();
        let ctx = MeshingContext::new(&terrain, &sim, Duration::ZERO);
        let mut scratch = Vec::new();

        mesh.update(Some(16), &ctx, &mut scratch);
        assert!(mesh.is_band_built(0) && mesh.is_band_built(1));

        let (_, _, mut fresh) = setup();
        fresh.update(Some(20), &ctx, &mut scratch);
        assert!(!fresh.is_band_built(0) && fresh.is_band_built(1));

        fresh.update(Some(64), &ctx, &mut scratch);
        fresh.update(Some(-3), &ctx, &mut scratch);
        assert_eq!(fresh.built_bands(), 1);
    }

    #[test]
    fn test_full_update_only_rebuilds_existing_bands() {
        let (mut terrain, sim, mut mesh) = setup();
        terrain.set(2, 20, 2, STONE).unwrap();
        let mut scratch = Vec::new();
        mesh.build_band(1, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch);

        let later = MeshingContext::new(&terrain, &sim, Duration::from_secs(3));
        mesh.update(None, &later, &mut scratch);
        assert!(!mesh.is_band_built(0));
        assert_eq!(mesh.band(1).unwrap().built_at(), Duration::from_secs(3));
    }

    #[test]
    fn test_update_is_idempotent() {
        let (mut terrain, sim, mut mesh) = setup();
        terrain.generate_flat(3);
        terrain.set(7, 2, 7, FENCE).unwrap();
        let ctx = MeshingContext::new(&terrain, &sim, Duration::ZERO);
        let mut scratch = Vec::new();

        mesh.update(Some(1), &ctx, &mut scratch);
        let first = mesh.band(0).unwrap().vertices().to_vec();
        mesh.update(Some(1), &ctx, &mut scratch);
        assert_eq!(mesh.band(0).unwrap().vertices(), first.as_slice());
    }

    #[test]
    fn test_render_builds_missing_bands_once_per_cooldown() {
        let (mut terrain, sim, mut mesh) = setup();
        terrain.set(2, 2, 2, STONE).unwrap();
        terrain.set(2, 20, 2, STONE).unwrap();
        let mut scratch = Vec::new();
        let mut sink = CountingSink::new();

        // the viewer's band is built first
        mesh.render(20, &MeshingContext::new(&terrain, &sim, Duration::ZERO), &mut scratch, &mut sink);
        assert!(mesh.is_band_built(1));
        assert!(!mesh.is_band_built(0));

        mesh.render(20, &MeshingContext::new(&terrain, &sim, Duration::from_millis(500)), &mut scratch, &mut sink);
        assert!(!mesh.is_band_built(0), "cooldown has not passed");

        mesh.render(20, &MeshingContext::new(&terrain, &sim, Duration::from_millis(1100)), &mut scratch, &mut sink);
        assert_eq!(mesh.built_bands(), 2);
        assert_eq!(sink.draw_calls, 5);
    }

    #[test]
    fn test_bounding_box_spans_the_column() {
        let (_, _, mesh) = setup();
        let bbox = mesh.bounding_box();
        assert_eq!(bbox.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.max, Point3::new(16.0, 32.0, 16.0));
    }
}
