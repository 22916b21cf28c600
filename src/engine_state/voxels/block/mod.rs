//! # Block Module
//!
//! Block ids and the rules that classify them.
//!
//! A block id is a single byte. `0` is empty space; any other regular id is the index of
//! the block's texture in the atlas plus one. Two reserved ids mark invisible "ghost"
//! solids that anchor entities such as doors, and the fence id selects the fence shape
//! instead of a textured cube.

pub mod cube_face;

pub use cube_face::{CubeFace, VisibleFaces};

/// The underlying integer type used to represent block ids in memory and on disk.
pub type BlockId = u8;

/// Empty space.
pub const EMPTY: BlockId = 0;

/// Invisible solid used as an entity anchor.
pub const INVISIBLE_SOLID: BlockId = 254;

/// Invisible solid that anchors a door. Passable while the door is open.
pub const INVISIBLE_DOOR: BlockId = 255;

/// Atlas index of the cart texture.
pub const CART_TEXTURE: u8 = 200;

/// Atlas index of the fence texture.
pub const FENCE_TEXTURE: u8 = 201;

/// Atlas index of the water texture.
pub const WATER_TEXTURE: u8 = 10;

/// Block id of a fence.
pub const FENCE: BlockId = FENCE_TEXTURE + 1;

/// Block id of water.
pub const WATER: BlockId = WATER_TEXTURE + 1;

/// Number of block textures per atlas row.
pub const TEXTURES_PER_ROW: u8 = 8;

/// Returns the block id that renders with atlas texture `texture`.
pub const fn block_for_texture(texture: u8) -> BlockId {
    texture + 1
}

/// Returns the atlas texture of a regular block, or `None` for empty and ghost cells.
pub fn texture_of(id: BlockId) -> Option<u8> {
    if id == EMPTY || is_invisible(id) {
        None
    } else {
        Some(id - 1)
    }
}

/// Returns `true` for the two ghost ids.
pub const fn is_invisible(id: BlockId) -> bool {
    id == INVISIBLE_SOLID || id == INVISIBLE_DOOR
}

/// Returns `true` for cells whose neighbours stay visible: empty space, ghosts and fences.
pub const fn is_see_through(id: BlockId) -> bool {
    id == EMPTY || is_invisible(id) || id == FENCE
}

/// Returns `true` for cells that darken the column below them.
pub const fn casts_shadow(id: BlockId) -> bool {
    !is_see_through(id)
}

/// Returns `true` for any non-empty cell, ghosts included.
pub const fn is_solid(id: BlockId) -> bool {
    id != EMPTY
}
