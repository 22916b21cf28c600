//! # Cube Face Module
//!
//! The six faces of a block and the per-block visibility record derived from them.

use cgmath::Vector3;
use num_derive::FromPrimitive;

/// Represents the six possible faces of a voxel block.
///
/// The discriminants match the order of the cube geometry tables and the persisted
/// entity record format: [FRONT, BACK, LEFT, RIGHT, BOTTOM, TOP]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum CubeFace {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The left face (facing negative X)
    LEFT = 2,

    /// The right face (facing positive X)
    RIGHT = 3,

    /// The bottom face (facing negative Y)
    BOTTOM = 4,

    /// The top face (facing positive Y)
    TOP = 5,
}

impl CubeFace {
    /// Returns all six faces in table order.
    pub fn all() -> [CubeFace; 6] {
        [
            CubeFace::FRONT,
            CubeFace::BACK,
            CubeFace::LEFT,
            CubeFace::RIGHT,
            CubeFace::BOTTOM,
            CubeFace::TOP,
        ]
    }

    /// Converts a stored discriminant back into a face.
    pub fn from_index(index: i32) -> Option<CubeFace> {
        num::FromPrimitive::from_i32(index)
    }

    /// Position of this face in the cube geometry tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Unit offset from a block to the neighbour this face looks at.
    pub fn normal(self) -> Vector3<i32> {
        match self {
            CubeFace::FRONT => Vector3::new(0, 0, 1),
            CubeFace::BACK => Vector3::new(0, 0, -1),
            CubeFace::LEFT => Vector3::new(-1, 0, 0),
            CubeFace::RIGHT => Vector3::new(1, 0, 0),
            CubeFace::BOTTOM => Vector3::new(0, -1, 0),
            CubeFace::TOP => Vector3::new(0, 1, 0),
        }
    }

    /// Returns `true` for the four vertical faces.
    pub fn is_side(self) -> bool {
        !matches!(self, CubeFace::BOTTOM | CubeFace::TOP)
    }
}

/// Which faces of one block border empty or see-through space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VisibleFaces {
    /// Face towards positive Z.
    pub front: bool,
    /// Face towards negative Z.
    pub back: bool,
    /// Face towards negative X.
    pub left: bool,
    /// Face towards positive X.
    pub right: bool,
    /// Face towards negative Y.
    pub bottom: bool,
    /// Face towards positive Y.
    pub top: bool,
}

impl VisibleFaces {
    /// All faces visible.
    pub const ALL: VisibleFaces = VisibleFaces {
        front: true,
        back: true,
        left: true,
        right: true,
        bottom: true,
        top: true,
    };

    /// Returns whether `face` is visible.
    pub fn is_visible(&self, face: CubeFace) -> bool {
        match face {
            CubeFace::FRONT => self.front,
            CubeFace::BACK => self.back,
            CubeFace::LEFT => self.left,
            CubeFace::RIGHT => self.right,
            CubeFace::BOTTOM => self.bottom,
            CubeFace::TOP => self.top,
        }
    }

    /// Number of visible faces.
    pub fn count(&self) -> usize {
        CubeFace::all()
            .into_iter()
            .filter(|face| self.is_visible(*face))
            .count()
    }

    /// Returns `true` if at least one face is visible.
    pub fn any(&self) -> bool {
        self.count() > 0
    }
}
