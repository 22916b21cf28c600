//! # Cube Geometry
//!
//! Static cube tables and the helpers that turn them into textured, lit vertices.
//!
//! Faces are stored in `CubeFace` order (front, back, left, right, bottom, top), four corners
//! each. A quad is emitted as the two triangles `0, 1, 2` and `2, 3, 0`, with atlas
//! coordinates assigned per corner as (minU, minV), (minU, maxV), (maxU, maxV), (maxU, minV).
//!
//! The texture atlas is 256x256 pixels made of 16x16 pixel cells.

use cgmath::Point3;

use super::vertex::Vertex;
use crate::engine_state::voxels::block::{CubeFace, VisibleFaces};

/// Edge of one atlas cell in atlas coordinates.
pub const ATLAS_CELL: f32 = 16.0 / 256.0;

/// Corners of one quad, in emission order.
pub const QUAD_INDICES: [usize; 6] = [0, 1, 2, 2, 3, 0];

/// Vertices emitted per quad.
pub const VERTICES_PER_QUAD: usize = QUAD_INDICES.len();

/// Inset used by the picking geometry so that neighbouring blocks do not share planes.
pub const PICK_EXTENT: f32 = 0.99;

/// Unit cube corners per face.
pub const FACE_CORNERS: [[[f32; 3]; 4]; 6] = [
    // front
    [[0.0, 1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0]],
    // back
    [[1.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    // left
    [[0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0]],
    // right
    [[1.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
    // bottom
    [[0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0]],
    // top
    [[1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 1.0]],
];

/// A cell of the texture atlas.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TexCell {
    pub row: u8,
    pub col: u8,
}

impl TexCell {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// Atlas coordinate bounds of one cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TexRect {
    pub min_u: f32,
    pub max_u: f32,
    pub min_v: f32,
    pub max_v: f32,
}

impl TexRect {
    /// The bounds covered by an atlas cell.
    pub fn from_cell(cell: TexCell) -> Self {
        let (row, col) = (cell.row as f32, cell.col as f32);
        Self {
            min_u: col * ATLAS_CELL,
            max_u: (col + 1.0) * ATLAS_CELL,
            min_v: row * ATLAS_CELL,
            max_v: (row + 1.0) * ATLAS_CELL,
        }
    }

    /// Atlas coordinates of quad corner `corner` (0..4).
    pub fn corner_uv(&self, corner: usize) -> [f32; 2] {
        match corner % 4 {
            0 => [self.min_u, self.min_v],
            1 => [self.min_u, self.max_v],
            2 => [self.max_u, self.max_v],
            _ => [self.max_u, self.min_v],
        }
    }

    /// Maps a unit-square coordinate into this rectangle.
    pub fn lerp(&self, u: f32, v: f32) -> [f32; 2] {
        [
            u * (self.max_u - self.min_u) + self.min_u,
            v * (self.max_v - self.min_v) + self.min_v,
        ]
    }
}

/// One textured corner of a translated cube, before lighting.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Corner {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Texture assignment for a whole cube.
#[derive(Copy, Clone, Debug)]
pub enum CubeTextures {
    /// One cell for every face.
    Uniform(TexCell),
    /// One cell per face, in `CubeFace` order.
    PerFace([TexCell; 6]),
}

impl CubeTextures {
    fn cell(&self, face: CubeFace) -> TexCell {
        match self {
            CubeTextures::Uniform(cell) => *cell,
            CubeTextures::PerFace(cells) => cells[face.index()],
        }
    }
}

/// Appends one textured quad (two triangles) for a cube face.
///
/// # Arguments
/// * `out` - Destination buffer
/// * `face` - Which face table to use
/// * `cell` - Atlas cell for the whole quad
/// * `scale` - Scale applied to the unit cube
/// * `centered` - Moves the cube origin to its centre before scaling
/// * `offset` - Translation applied after scaling
/// * `brightness` - Value written to every vertex color
pub fn push_face(
    out: &mut Vec<Vertex>,
    face: CubeFace,
    cell: TexCell,
    scale: f32,
    centered: bool,
    offset: [f32; 3],
    brightness: f32,
) {
    let rect = TexRect::from_cell(cell);
    let shift = if centered { 0.5 } else { 0.0 };
    let corners = &FACE_CORNERS[face.index()];

    for corner in QUAD_INDICES {
        let p = corners[corner];
        let position = [
            (p[0] - shift) * scale + offset[0],
            (p[1] - shift) * scale + offset[1],
            (p[2] - shift) * scale + offset[2],
        ];
        let [u, v] = rect.corner_uv(corner);
        out.push(Vertex::new(position, u, v, brightness));
    }
}

/// Generates the 36 vertices of a textured cube.
///
/// # Example
/// ```rust
/// use blockscape::engine_state::rendering::cube_vertices::{cube_vertices, CubeTextures, TexCell};
///
/// let vertices = cube_vertices(CubeTextures::Uniform(TexCell::new(0, 3)), 1.0, true, 1.0);
/// assert_eq!(vertices.len(), 36);
/// assert!(vertices.iter().all(|v| v.position.iter().all(|c| c.abs() <= 0.5)));
/// ```
pub fn cube_vertices(textures: CubeTextures, scale: f32, centered: bool, brightness: f32) -> Vec<Vertex> {
    let mut out = Vec::with_capacity(VERTICES_PER_QUAD * 6);
    for face in CubeFace::all() {
        push_face(
            &mut out,
            face,
            textures.cell(face),
            scale,
            centered,
            [0.0; 3],
            brightness,
        );
    }
    out
}

/// The 24 unique corners of the unit cube translated to a block position, textured with
/// `rect` on every face. Indexed as `[face][corner]`.
pub fn translated_face_corners(x: f32, y: f32, z: f32, rect: &TexRect) -> [[Corner; 4]; 6] {
    let mut corners = [[Corner {
        position: [0.0; 3],
        uv: [0.0; 2],
    }; 4]; 6];

    for (face, table) in FACE_CORNERS.iter().enumerate() {
        for (corner, p) in table.iter().enumerate() {
            corners[face][corner] = Corner {
                position: [p[0] + x, p[1] + y, p[2] + z],
                uv: rect.corner_uv(corner),
            };
        }
    }
    corners
}

/// Per-corner normals for the 24 unique cube corners.
pub fn face_normals() -> Vec<[f32; 3]> {
    CubeFace::all()
        .iter()
        .flat_map(|face| {
            let n = face.normal();
            [[n.x as f32, n.y as f32, n.z as f32]; 4]
        })
        .collect()
}

/// Triangles of the visible faces of a block, for ray picking.
///
/// Corners are inset to `PICK_EXTENT` and faces are emitted in the order left, right,
/// front, back, bottom, top.
pub fn block_pick_triangles(x: i32, y: i32, z: i32, faces: VisibleFaces) -> Vec<Point3<f32>> {
    let order = [
        CubeFace::LEFT,
        CubeFace::RIGHT,
        CubeFace::FRONT,
        CubeFace::BACK,
        CubeFace::BOTTOM,
        CubeFace::TOP,
    ];

    let mut tris = Vec::with_capacity(faces.count() * VERTICES_PER_QUAD);
    for face in order.into_iter().filter(|f| faces.is_visible(*f)) {
        let corners = &FACE_CORNERS[face.index()];
        for corner in QUAD_INDICES {
            let p = corners[corner].map(|c| c * PICK_EXTENT);
            tris.push(Point3::new(p[0] + x as f32, p[1] + y as f32, p[2] + z as f32));
        }
    }
    tris
}
