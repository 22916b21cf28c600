//! # Camera State
//!
//! The engine core only ever reads the camera: its position, its orientation, its matrices
//! and whether a box is inside its view frustum. Those queries form the `CameraView` trait.
//! `Camera` is the stock first-person implementation; hosts with their own camera simply
//! implement the trait.
//!
//! ## Core Components
//! - `CameraView`: Read-only camera queries used by terrain picking and chunk culling
//! - `Camera` / `Projection`: First-person camera with a perspective projection
//! - `Frustum` / `BoundingBox`: Plane extraction and box culling

use cgmath::{Matrix4, Point3, Rad, Vector3};

pub mod camera;
pub mod frustum;

pub use camera::{Camera, Projection};
pub use frustum::{BoundingBox, Frustum};

/// Read-only camera queries consumed by the engine core.
pub trait CameraView {
    /// Eye position in world space.
    fn position(&self) -> Point3<f32>;

    /// Normalized viewing direction.
    fn forward(&self) -> Vector3<f32>;

    /// Normalized up direction.
    fn up(&self) -> Vector3<f32>;

    /// World to view space transform.
    fn view_matrix(&self) -> Matrix4<f32>;

    /// View to clip space transform.
    fn projection_matrix(&self) -> Matrix4<f32>;

    /// Vertical field of view.
    fn field_of_view(&self) -> Rad<f32>;

    /// Origin and direction of the ray used for block picking.
    fn pick_ray(&self) -> (Point3<f32>, Vector3<f32>) {
        (self.position(), self.forward())
    }

    /// The view frustum for the current matrices.
    fn frustum(&self) -> Frustum {
        Frustum::from_matrix(self.projection_matrix() * self.view_matrix())
    }

    /// Returns `true` if any part of `bbox` may be visible.
    fn box_in_frustum(&self, bbox: &BoundingBox) -> bool {
        self.frustum().contains_box(bbox)
    }
}
