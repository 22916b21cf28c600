//! # Terrain Module
//!
//! The `Terrain` owns the block grid and the decorative entities placed in it, and
//! publishes every committed change on a typed change channel.
//!
//! ## Mutation protocol
//!
//! - `set` writes a cell and notifies subscribers immediately.
//! - `lazy_set` writes a cell but only queues the notification; `lazy_set_flush` emits one
//!   notification per queued position. Explosions and other bulk edits use this to coalesce
//!   rebuild requests.
//! - Entity edits notify with `entity_update` set, see the `entities` module.
//!
//! Generation writes the grid directly and never notifies; freshly generated terrain is
//! meshed from scratch by whoever consumes it.
//!
//! ## Example
//! ```rust
//! use blockscape::engine_state::config::WorldDimensions;
//! use blockscape::engine_state::voxels::terrain::Terrain;
//!
//! let mut terrain = Terrain::new(WorldDimensions::new(32, 16, 32));
//! let changes = terrain.subscribe();
//! terrain.set(1, 2, 3, 5).unwrap();
//! assert_eq!(terrain.get(1, 2, 3), Some(5));
//! assert_eq!(changes.drain().len(), 1);
//! ```

pub mod entities;
pub mod generation;
pub mod persistence;

use cgmath::{InnerSpace, Point3, Vector3};

use crate::core::{ChangeChannel, Subscription};
use crate::engine_state::camera_state::CameraView;
use crate::engine_state::config::WorldDimensions;
use crate::engine_state::error::EngineResult;
use crate::engine_state::voxels::block::{self, BlockId, VisibleFaces, EMPTY, INVISIBLE_DOOR};
use crate::engine_state::voxels::entity::Entity;
use crate::engine_state::voxels::grid::VoxelGrid;

/// A committed change of the terrain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockChange {
    /// Position of the changed block or of the edited entity's anchor.
    pub pos: Point3<i32>,
    /// `true` if only entity geometry is affected.
    pub entity_update: bool,
}

/// The voxel world: block grid, decorative entities and the change channel.
#[derive(Debug)]
pub struct Terrain {
    grid: VoxelGrid,
    entities: Vec<Entity>,
    last_entity: Option<Entity>,
    changes: ChangeChannel<BlockChange>,
    pending_changes: Vec<Point3<i32>>,
}

impl Terrain {
    /// Creates an empty terrain.
    pub fn new(dimensions: WorldDimensions) -> Self {
        Self::from_grid(VoxelGrid::new(dimensions))
    }

    /// Creates a terrain around an existing grid, without entities.
    pub fn from_grid(grid: VoxelGrid) -> Self {
        Self {
            grid,
            entities: Vec::new(),
            last_entity: None,
            changes: ChangeChannel::new(),
            pending_changes: Vec::new(),
        }
    }

    /// Extents of the block grid.
    pub fn dimensions(&self) -> WorldDimensions {
        self.grid.dimensions()
    }

    /// Read access to the underlying grid.
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut VoxelGrid {
        &mut self.grid
    }

    /// Registers a new change subscriber.
    pub fn subscribe(&mut self) -> Subscription<BlockChange> {
        self.changes.subscribe()
    }

    pub(crate) fn notify(&mut self, pos: Point3<i32>, entity_update: bool) {
        self.changes.notify(BlockChange { pos, entity_update });
    }

    /// Returns `true` if the position lies inside the grid.
    pub fn is_valid_pos(&self, x: i32, y: i32, z: i32) -> bool {
        self.grid.contains(x, y, z)
    }

    /// Block id at a position, or `None` outside the grid.
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<BlockId> {
        self.grid.get(x, y, z)
    }

    /// Block id at a position, or `EMPTY` outside the grid.
    pub fn get_or_default(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.grid.get_or_default(x, y, z)
    }

    /// Writes a block and notifies subscribers.
    ///
    /// # Returns
    /// `OutOfBounds` if the position is outside the grid; nothing is written or notified.
    pub fn set(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> EngineResult<()> {
        self.grid.set(x, y, z, id)?;
        self.notify(Point3::new(x, y, z), false);
        Ok(())
    }

    /// Writes a block and queues its notification until the next `lazy_set_flush`.
    pub fn lazy_set(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> EngineResult<()> {
        self.grid.set(x, y, z, id)?;
        self.pending_changes.push(Point3::new(x, y, z));
        Ok(())
    }

    /// Emits one notification per position queued by `lazy_set`, in order, and clears the
    /// queue.
    ///
    /// # Returns
    /// The number of notifications emitted.
    pub fn lazy_set_flush(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_changes);
        let flushed = pending.len();
        for pos in pending {
            self.notify(pos, false);
        }
        flushed
    }

    /// Number of lazy writes waiting for a flush.
    pub fn pending_change_count(&self) -> usize {
        self.pending_changes.len()
    }

    /// Passability test.
    ///
    /// True outside the grid, for empty cells, and for an invisible door cell whose door is
    /// currently open.
    pub fn is_empty_pos(&self, x: i32, y: i32, z: i32) -> bool {
        match self.grid.get(x, y, z) {
            None => true,
            Some(EMPTY) => true,
            Some(INVISIBLE_DOOR) => self.is_open_door_at(x, y, z),
            Some(_) => false,
        }
    }

    /// Passability test for a point in world space.
    ///
    /// The point is mapped to the cell that contains it, so coordinates in `(-1, 0)` land
    /// outside the grid and count as empty.
    pub fn is_empty_at(&self, point: Point3<f32>) -> bool {
        self.is_empty_pos(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }

    fn is_see_through(&self, x: i32, y: i32, z: i32) -> bool {
        block::is_see_through(self.grid.get_or_default(x, y, z))
    }

    /// Computes which faces of the block at a position are visible.
    ///
    /// A face is visible if it lies on the grid boundary or if the neighbour it looks at is
    /// empty, a ghost, or a fence.
    pub fn determine_visible_faces(&self, x: i32, y: i32, z: i32) -> VisibleFaces {
        let dims = self.dimensions();
        let (max_x, max_y, max_z) = (dims.x as i32 - 1, dims.y as i32 - 1, dims.z as i32 - 1);
        VisibleFaces {
            front: z == max_z || self.is_see_through(x, y, z + 1),
            back: z == 0 || self.is_see_through(x, y, z - 1),
            left: x == 0 || self.is_see_through(x - 1, y, z),
            right: x == max_x || self.is_see_through(x + 1, y, z),
            bottom: y == 0 || self.is_see_through(x, y - 1, z),
            top: y == max_y || self.is_see_through(x, y + 1, z),
        }
    }

    /// Returns `true` if a shadow-casting block exists anywhere above the position in the
    /// same column. False outside the grid.
    pub fn is_block_above(&self, x: i32, y: i32, z: i32) -> bool {
        if !self.grid.contains(x, y, z) {
            return false;
        }
        let height = self.dimensions().y as i32;
        ((y + 1)..height).any(|k| block::casts_shadow(self.grid.get_or_default(x, k, z)))
    }

    /// Number of visible (non-ghost) blocks above the position.
    pub fn num_blocks_above(&self, x: i32, y: i32, z: i32) -> usize {
        let height = self.dimensions().y as i32;
        ((y + 1)..height)
            .filter(|k| {
                let id = self.grid.get_or_default(x, *k, z);
                id != EMPTY && !block::is_invisible(id)
            })
            .count()
    }

    /// Height of the first impassable block below the position, or 0 if there is none.
    pub fn y_of_block_below(&self, x: i32, y: i32, z: i32) -> i32 {
        ((1..y).rev())
            .find(|cy| !self.is_empty_pos(x, *cy, z))
            .unwrap_or(0)
    }

    /// Vertical distance from a height `y` to the top of the solid ground below it.
    pub fn dy_to_solid_below(&self, x: i32, y: f32, z: i32) -> f32 {
        let mut cy = y as i32;
        let mut dy = y - cy as f32;
        while cy > 0 && self.is_empty_pos(x, cy, z) {
            dy += 1.0;
            cy -= 1;
        }
        dy
    }

    /// Fraction of impassable cells in the cube of half-extent `extent` around a position.
    pub fn density_around(&self, x: i32, y: i32, z: i32, extent: i32) -> f32 {
        let extent = extent.max(0);
        let mut solid = 0usize;
        for xc in (x - extent)..=(x + extent) {
            for yc in (y - extent)..=(y + extent) {
                for zc in (z - extent)..=(z + extent) {
                    if !self.is_empty_pos(xc, yc, zc) {
                        solid += 1;
                    }
                }
            }
        }
        let side = (2 * extent + 1) as f32;
        solid as f32 / (side * side * side)
    }

    /// Non-empty blocks (ghosts included) within `near_dist` of the camera that lie roughly
    /// inside its field of view. Candidates for block picking.
    pub fn blocks_near<C: CameraView + ?Sized>(&self, camera: &C, near_dist: i32) -> Vec<Point3<i32>> {
        let eye = camera.position();
        let forward = camera.forward();
        let max_angle = camera.field_of_view().0 + std::f32::consts::PI / 10.0;
        let (cx, cy, cz) = (eye.x as i32, eye.y as i32, eye.z as i32);

        let mut near = Vec::new();
        for a in (cx - near_dist)..=(cx + near_dist) {
            for b in (cy - near_dist)..=(cy + near_dist) {
                for c in (cz - near_dist)..=(cz + near_dist) {
                    match self.grid.get(a, b, c) {
                        None | Some(EMPTY) => continue,
                        Some(_) => {}
                    }
                    let to_block = Vector3::new(
                        a as f32 + 0.5 - eye.x,
                        b as f32 + 0.5 - eye.y,
                        c as f32 + 0.5 - eye.z,
                    );
                    if to_block.magnitude2() > 0.0 && to_block.angle(forward).0 >= max_angle {
                        continue;
                    }
                    near.push(Point3::new(a, b, c));
                }
            }
        }
        near
    }

    /// Overwrites every cell with `EMPTY`. Entities are kept.
    pub fn clear(&mut self) {
        self.grid.fill(EMPTY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::{CubeFace, FENCE, INVISIBLE_SOLID};
    use crate::engine_state::voxels::entity::EntityKind;

    fn terrain() -> Terrain {
        Terrain::new(WorldDimensions::new(32, 16, 32))
    }

    #[test]
    fn test_set_notifies_once() {
        let mut terrain = terrain();
        let changes = terrain.subscribe();
        terrain.set(3, 4, 5, 2).unwrap();
        assert_eq!(
            changes.drain(),
            vec![BlockChange {
                pos: Point3::new(3, 4, 5),
                entity_update: false
            }]
        );
    }

    #[test]
    fn test_out_of_range_set_is_rejected_silently() {
        let mut terrain = terrain();
        let changes = terrain.subscribe();
        assert!(terrain.set(32, 0, 0, 1).is_err());
        assert!(terrain.lazy_set(0, -1, 0, 1).is_err());
        assert!(changes.is_empty());
        assert_eq!(terrain.pending_change_count(), 0);
    }

    #[test]
    fn test_lazy_set_defers_notifications() {
        let mut terrain = terrain();
        let changes = terrain.subscribe();
        terrain.lazy_set(1, 1, 1, 3).unwrap();
        terrain.lazy_set(2, 1, 1, 4).unwrap();
        assert_eq!(terrain.get(2, 1, 1), Some(4), "lazy writes are immediate");
        assert!(changes.is_empty(), "notifications wait for the flush");

        assert_eq!(terrain.lazy_set_flush(), 2);
        let positions: Vec<_> = changes.drain().into_iter().map(|c| c.pos).collect();
        assert_eq!(positions, vec![Point3::new(1, 1, 1), Point3::new(2, 1, 1)]);
        assert_eq!(terrain.lazy_set_flush(), 0);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_visibility_of_enclosed_and_boundary_blocks() {
        let mut terrain = terrain();
        for x in 4..=6 {
            for y in 4..=6 {
                for z in 4..=6 {
                    terrain.set(x, y, z, 1).unwrap();
                }
            }
        }
        assert_eq!(terrain.determine_visible_faces(5, 5, 5).count(), 0);

        let corner = terrain.determine_visible_faces(4, 4, 4);
        assert!(corner.left && corner.back && corner.bottom);
        assert!(!corner.right && !corner.front && !corner.top);

        // Boundary faces are visible regardless of contents.
        terrain.set(0, 0, 0, 1).unwrap();
        terrain.set(1, 0, 0, 1).unwrap();
        let edge = terrain.determine_visible_faces(0, 0, 0);
        assert!(edge.left && edge.bottom && edge.back);
        assert!(!edge.right);
    }

    #[test]
    fn test_see_through_neighbours_keep_faces_visible() {
        let mut terrain = terrain();
        terrain.set(5, 5, 5, 1).unwrap();
        terrain.set(6, 5, 5, FENCE).unwrap();
        terrain.set(4, 5, 5, INVISIBLE_SOLID).unwrap();
        terrain.set(5, 6, 5, 9).unwrap();
        let faces = terrain.determine_visible_faces(5, 5, 5);
        assert!(faces.right, "fences occlude nothing");
        assert!(faces.left, "ghost blocks occlude nothing");
        assert!(!faces.top);
        assert_eq!(faces, terrain.determine_visible_faces(5, 5, 5));
    }

    #[test]
    fn test_invisible_door_passability_follows_door_state() {
        let mut terrain = terrain();
        terrain.set(5, 3, 5, INVISIBLE_DOOR).unwrap();
        terrain.set(5, 4, 5, INVISIBLE_DOOR).unwrap();

        terrain.add_entity(Entity::new(Point3::new(5, 3, 5), EntityKind::DOOR_X, CubeFace::TOP));
        assert!(!terrain.is_empty_pos(5, 3, 5), "closed door blocks");
        assert!(!terrain.is_empty_pos(5, 4, 5), "upper half of a closed door blocks");

        terrain.remove_entity_at(5, 3, 5, None);
        terrain.add_entity(Entity::new(Point3::new(5, 3, 5), EntityKind::DOOR_X_OPEN, CubeFace::TOP));
        assert!(terrain.is_empty_pos(5, 3, 5), "open door is passable");
        assert!(terrain.is_empty_pos(5, 4, 5), "upper half of an open door is passable");
    }

    #[test]
    fn test_emptiness_outside_and_ghost_solid() {
        let mut terrain = terrain();
        terrain.set(2, 2, 2, INVISIBLE_SOLID).unwrap();
        assert!(terrain.is_empty_pos(-1, 0, 0));
        assert!(terrain.is_empty_pos(1, 1, 1));
        assert!(!terrain.is_empty_pos(2, 2, 2));
        assert!(!terrain.is_empty_at(Point3::new(2.5, 2.1, 2.9)));

        terrain.set(0, 0, 0, 1).unwrap();
        assert!(!terrain.is_empty_at(Point3::new(0.5, 0.5, 0.5)));
        assert!(terrain.is_empty_at(Point3::new(-0.5, 0.5, 0.5)));
    }

    #[test]
    fn test_block_above_ignores_see_through_ids() {
        let mut terrain = terrain();
        terrain.set(3, 10, 3, FENCE).unwrap();
        terrain.set(3, 11, 3, INVISIBLE_DOOR).unwrap();
        assert!(!terrain.is_block_above(3, 2, 3));
        terrain.set(3, 12, 3, 4).unwrap();
        assert!(terrain.is_block_above(3, 2, 3));
        assert!(!terrain.is_block_above(3, 12, 3));
        assert!(!terrain.is_block_above(-1, 2, 3));
        assert_eq!(terrain.num_blocks_above(3, 2, 3), 2);
    }

    #[test]
    fn test_ground_queries() {
        let mut terrain = terrain();
        terrain.set(1, 3, 1, 1).unwrap();
        assert_eq!(terrain.y_of_block_below(1, 8, 1), 3);
        assert_eq!(terrain.y_of_block_below(2, 8, 2), 0);
        // Counts every empty cell from the start cell down to the solid one.
        let dy = terrain.dy_to_solid_below(1, 6.5, 1);
        assert!((dy - 3.5).abs() < 1e-6, "got {dy}");
    }

    #[test]
    fn test_density_counts_solid_cells() {
        let mut terrain = terrain();
        terrain.set(5, 5, 5, 1).unwrap();
        let density = terrain.density_around(5, 5, 5, 1);
        assert!((density - 1.0 / 27.0).abs() < 1e-6);
        assert_eq!(terrain.density_around(20, 5, 20, 0), 0.0);
    }

    #[test]
    fn test_blocks_near_clips_at_the_grid_corner() {
        use crate::engine_state::camera_state::{Camera, Projection};
        use cgmath::Deg;

        let mut terrain = terrain();
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    terrain.set(x, y, z, 1).unwrap();
                }
            }
        }
        // a field of view this wide keeps every direction
        let camera = Camera::new(
            (0.5, 0.5, 0.5),
            Deg(0.0),
            Deg(0.0),
            Projection::new(800, 600, Deg(180.0), 0.1, 100.0),
        );

        let near = terrain.blocks_near(&camera, 2);
        assert_eq!(near.len(), 27);
        assert!(near.iter().all(|p| (0..=2).contains(&p.x)
            && (0..=2).contains(&p.y)
            && (0..=2).contains(&p.z)));

        terrain.set(1, 1, 1, EMPTY).unwrap();
        assert_eq!(terrain.blocks_near(&camera, 2).len(), 26);
        assert_eq!(terrain.blocks_near(&camera, 0), vec![Point3::new(0, 0, 0)]);
    }
}
