//! # Frustum Culling
//!
//! Extracts the six clip planes from a combined view-projection matrix and tests
//! axis-aligned boxes against them. Plane normals point into the frustum.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3, Vector4};

/// An axis-aligned box in world space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    /// Corner with the smallest coordinates.
    pub min: Point3<f32>,
    /// Corner with the largest coordinates.
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Creates a box from its two extreme corners.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Returns `true` if the point lies inside the box or on its surface.
    pub fn contains(&self, p: Point3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point3::new(lo.x, hi.y, hi.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
        ]
    }
}

/// The six clip planes of a view frustum: left, right, bottom, top, near, far.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum {
    planes: [Vector4<f32>; 6],
}

impl Frustum {
    /// Extracts the clip planes from `projection * view`.
    ///
    /// The projection is expected to map depth to `[-1, 1]` as `cgmath::perspective` does.
    pub fn from_matrix(m: Matrix4<f32>) -> Self {
        let row = |i: usize| Vector4::new(m.x[i], m.y[i], m.z[i], m.w[i]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2].map(|plane| {
            let len = Vector3::new(plane.x, plane.y, plane.z).magnitude();
            if len > 0.0 {
                plane / len
            } else {
                plane
            }
        });
        Self { planes }
    }

    fn outside(plane: &Vector4<f32>, p: Point3<f32>) -> bool {
        plane.x * p.x + plane.y * p.y + plane.z * p.z + plane.w <= 0.0
    }

    /// Returns `true` if the point lies strictly inside every plane.
    pub fn contains_point(&self, p: Point3<f32>) -> bool {
        self.planes.iter().all(|plane| !Self::outside(plane, p))
    }

    /// Conservative box test: `false` only if all eight corners lie outside one plane.
    pub fn contains_box(&self, bbox: &BoundingBox) -> bool {
        let corners = bbox.corners();
        !self
            .planes
            .iter()
            .any(|plane| corners.iter().all(|c| Self::outside(plane, *c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{perspective, Deg};

    fn looking_down_positive_x() -> Frustum {
        let view = Matrix4::look_to_rh(
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_x(),
            Vector3::unit_y(),
        );
        let proj = perspective(Deg(60.0), 1.0, 0.1, 100.0);
        Frustum::from_matrix(proj * view)
    }

    #[test]
    fn test_point_in_front_is_inside() {
        let frustum = looking_down_positive_x();
        assert!(frustum.contains_point(Point3::new(10.0, 0.0, 0.0)));
        assert!(!frustum.contains_point(Point3::new(-10.0, 0.0, 0.0)));
        assert!(!frustum.contains_point(Point3::new(200.0, 0.0, 0.0)));
    }

    #[test]
    fn test_box_culling() {
        let frustum = looking_down_positive_x();
        let ahead = BoundingBox::new(Point3::new(10.0, -1.0, -1.0), Point3::new(12.0, 1.0, 1.0));
        let behind = BoundingBox::new(Point3::new(-12.0, -1.0, -1.0), Point3::new(-10.0, 1.0, 1.0));
        let straddling = BoundingBox::new(Point3::new(-5.0, -1.0, -1.0), Point3::new(5.0, 1.0, 1.0));
        assert!(frustum.contains_box(&ahead));
        assert!(!frustum.contains_box(&behind));
        assert!(frustum.contains_box(&straddling));
    }

    #[test]
    fn test_bounding_box_contains() {
        let bbox = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(16.0, 64.0, 16.0));
        assert!(bbox.contains(Point3::new(8.0, 30.0, 16.0)));
        assert!(!bbox.contains(Point3::new(8.0, 65.0, 8.0)));
    }
}
