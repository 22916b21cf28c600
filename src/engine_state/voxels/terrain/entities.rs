//! Entity bookkeeping for the terrain.
//!
//! At most one entity may occupy a (position, face) slot. Adding or removing an entity
//! notifies subscribers with `entity_update` set; torches notify a second time without the
//! flag because their light changes nearby block meshes too.

use cgmath::{InnerSpace, Point3, Vector3};

use super::Terrain;
use crate::engine_state::voxels::block::CubeFace;
use crate::engine_state::voxels::entity::{Entity, EntityCounts, EntityKind};

impl Terrain {
    /// All entities in insertion order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns `true` if at least one entity exists.
    pub fn has_entities(&self) -> bool {
        !self.entities.is_empty()
    }

    /// The entity most recently added or removed.
    pub fn last_entity(&self) -> Option<Entity> {
        self.last_entity
    }

    /// Inserts an entity unless its (position, face) slot is already taken.
    ///
    /// # Returns
    /// `true` if the entity was inserted, `false` for a duplicate (nothing changes).
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        if self.entities.iter().any(|e| e.same_slot(&entity)) {
            return false;
        }

        self.entities.push(entity);
        self.last_entity = Some(entity);
        self.notify(entity.pos, true);
        if entity.kind == EntityKind::TORCH {
            self.notify(entity.pos, false);
        }
        true
    }

    /// Removes the entities at a position, optionally only the one on `face`.
    ///
    /// # Arguments
    /// * `face` - `None` removes entities on every face
    ///
    /// # Returns
    /// `true` if any entity existed at the position, whether or not its face matched. Edit
    /// logic uses this to decide whether the anchor block should stay.
    pub fn remove_entity_at(&mut self, x: i32, y: i32, z: i32, face: Option<CubeFace>) -> bool {
        let pos = Point3::new(x, y, z);
        let occupied = self.entities.iter().any(|e| e.pos == pos);
        if !occupied {
            return false;
        }

        let (removed, kept): (Vec<Entity>, Vec<Entity>) = std::mem::take(&mut self.entities)
            .into_iter()
            .partition(|e| e.pos == pos && face.map_or(true, |f| e.face == f));
        self.entities = kept;

        for entity in removed {
            self.last_entity = Some(entity);
            self.notify(pos, true);
            if entity.kind == EntityKind::TORCH {
                self.notify(pos, false);
            }
        }
        true
    }

    /// Entities anchored at a position, optionally filtered by kind.
    pub fn entities_at(&self, x: i32, y: i32, z: i32, kind: Option<EntityKind>) -> Vec<Entity> {
        let pos = Point3::new(x, y, z);
        self.entities
            .iter()
            .filter(|e| e.pos == pos && kind.map_or(true, |k| e.kind == k))
            .copied()
            .collect()
    }

    /// All entities of one kind.
    pub fn entities_of_kind(&self, kind: EntityKind) -> Vec<Entity> {
        self.entities
            .iter()
            .filter(|e| e.kind == kind)
            .copied()
            .collect()
    }

    /// Entities whose anchor lies in `[min_x, max_x) x [min_z, max_z)`, plus category
    /// counts for sizing their geometry.
    pub fn entities_in_area(
        &self,
        min_x: i32,
        max_x: i32,
        min_z: i32,
        max_z: i32,
    ) -> (Vec<Entity>, EntityCounts) {
        let mut counts = EntityCounts::default();
        let found = self
            .entities
            .iter()
            .filter(|e| (min_x..max_x).contains(&e.pos.x) && (min_z..max_z).contains(&e.pos.z))
            .inspect(|e| counts.record(e))
            .copied()
            .collect();
        (found, counts)
    }

    /// Returns `true` if a ladder is mounted on `face` of the block at a position.
    pub fn has_ladder_on_face(&self, x: i32, y: i32, z: i32, face: CubeFace) -> bool {
        let pos = Point3::new(x, y, z);
        self.entities
            .iter()
            .any(|e| e.pos == pos && e.kind == EntityKind::LADDER && e.face == face)
    }

    /// Returns `true` if an open door occupies the cell or the cell below it (doors are two
    /// blocks tall and anchored at their lower half).
    pub fn is_open_door_at(&self, x: i32, y: i32, z: i32) -> bool {
        let here = Point3::new(x, y, z);
        let below = Point3::new(x, y - 1, z);
        self.entities
            .iter()
            .any(|e| (e.pos == here || e.pos == below) && e.kind.is_open_door())
    }

    /// Distance from a point to the nearest torch shining towards it.
    ///
    /// A torch mounted on a side face only lights the half-space in front of that face.
    /// Distances are measured from the torch cell's horizontal centre.
    ///
    /// # Returns
    /// The distance, or the world's X extent if no torch qualifies.
    pub fn distance_to_nearest_light(&self, x: f32, y: f32, z: f32) -> f32 {
        let point = Vector3::new(x, y, z);
        self.entities
            .iter()
            .filter(|e| e.kind == EntityKind::TORCH)
            .filter(|e| {
                let (tx, tz) = (e.pos.x as f32, e.pos.z as f32);
                !match e.face {
                    CubeFace::LEFT => x > tx,
                    CubeFace::RIGHT => x < tx,
                    CubeFace::FRONT => z < tz,
                    CubeFace::BACK => z > tz,
                    CubeFace::TOP | CubeFace::BOTTOM => false,
                }
            })
            .map(|e| {
                let light = Vector3::new(e.pos.x as f32 + 0.5, e.pos.y as f32, e.pos.z as f32 + 0.5);
                (light - point).magnitude()
            })
            .fold(self.dimensions().x as f32, f32::min)
    }
}
