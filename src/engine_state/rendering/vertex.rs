//! Vertex data structures for voxel rendering.
//!
//! Every mesh the core produces is a flat, non-indexed triangle list of `Vertex` values.
//! Backends upload the slice as-is; the struct is `Pod` so `bytemuck::cast_slice` turns it
//! into bytes without copying.

/// A vertex of a chunk or entity mesh.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Color: [f32; 4] (16 bytes)
///
/// Total size: 36 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in world space
    pub position: [f32; 3],
    /// UV coordinates into the texture atlas (0.0-1.0)
    pub tex_coords: [f32; 2],
    /// Vertex color; the rgb channels carry the brightness, alpha is always 1
    pub color: [f32; 4],
}

impl Vertex {
    /// Number of `f32` components per vertex.
    pub const COMPONENTS: usize = 9;

    /// Creates a grey vertex.
    ///
    /// # Arguments
    /// * `position` - Position in world space
    /// * `u`, `v` - Atlas coordinates
    /// * `brightness` - Value written to the r, g and b channels
    pub fn new(position: [f32; 3], u: f32, v: f32, brightness: f32) -> Self {
        Vertex {
            position,
            tex_coords: [u, v],
            color: [brightness, brightness, brightness, 1.0],
        }
    }

    /// The brightness stored in the color channels.
    pub fn brightness(&self) -> f32 {
        self.color[0]
    }

    /// Reinterprets a vertex slice as raw bytes for upload.
    pub fn as_bytes(vertices: &[Vertex]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }
}
