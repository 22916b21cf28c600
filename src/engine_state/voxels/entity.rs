//! # Entity Module
//!
//! Decorative objects attached to one face of one block: ladders, torches, glass panes,
//! flora, rails and doors. Entities do not occupy grid cells themselves; doors and similar
//! objects anchor to an invisible ghost block.

use cgmath::Point3;
use num_derive::FromPrimitive;

use super::block::CubeFace;

/// The kind of a decorative entity.
///
/// Discriminants are part of the persisted entity record format.
#[allow(non_camel_case_types)]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum EntityKind {
    /// A ladder on a side face.
    LADDER = 0,
    /// A torch, standing on a top face or mounted on a side face.
    TORCH = 1,
    /// A glass pane filling a whole cell.
    GLASS = 2,
    /// A flower standing on a top face.
    FLOWER = 3,
    /// A mushroom standing on a top face.
    MUSHROOM = 4,
    /// A rail lying on a top face.
    RAIL = 5,
    /// A closed door whose leaf spans the X axis.
    DOOR_X = 6,
    /// The open state of `DOOR_X`.
    DOOR_X_OPEN = 7,
    /// A closed door whose leaf spans the Z axis.
    DOOR_Z = 8,
    /// The open state of `DOOR_Z`.
    DOOR_Z_OPEN = 9,
}

impl EntityKind {
    /// Converts a stored discriminant back into a kind.
    pub fn from_index(index: i32) -> Option<EntityKind> {
        num::FromPrimitive::from_i32(index)
    }

    /// Returns `true` for the four door variants.
    pub fn is_door(self) -> bool {
        matches!(
            self,
            EntityKind::DOOR_X | EntityKind::DOOR_X_OPEN | EntityKind::DOOR_Z | EntityKind::DOOR_Z_OPEN
        )
    }

    /// Returns `true` for the two open door variants.
    pub fn is_open_door(self) -> bool {
        matches!(self, EntityKind::DOOR_X_OPEN | EntityKind::DOOR_Z_OPEN)
    }

    /// Atlas row of this kind's texture cell.
    pub fn texture_row(self) -> u8 {
        2 + self as u8
    }
}

/// Atlas column shared by every entity texture.
pub const ENTITY_TEXTURE_COL: u8 = 8;

/// A decorative entity anchored at a block position and face.
#[derive(Copy, Clone, Debug)]
pub struct Entity {
    /// Anchor block.
    pub pos: Point3<i32>,
    /// What the entity is.
    pub kind: EntityKind,
    /// Face of the anchor block the entity is mounted on.
    pub face: CubeFace,
}

impl Entity {
    /// Creates a new entity.
    pub fn new(pos: Point3<i32>, kind: EntityKind, face: CubeFace) -> Self {
        Self { pos, kind, face }
    }

    /// Returns `true` if `other` occupies the same (position, face) slot.
    pub fn same_slot(&self, other: &Entity) -> bool {
        self.pos == other.pos && self.face == other.face
    }

    /// Flora, and torches standing on a top face, render as four crossed quads.
    pub fn is_standing(&self) -> bool {
        match self.kind {
            EntityKind::FLOWER | EntityKind::MUSHROOM => true,
            EntityKind::TORCH => self.face == CubeFace::TOP,
            _ => false,
        }
    }
}

/// Equality is by (position, face); the kind does not take part.
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.same_slot(other)
    }
}

impl Eq for Entity {}

/// Category counts for a set of entities, used to size entity geometry up front.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityCounts {
    /// Glass panes (six quads each).
    pub glass: usize,
    /// Standing flora and torches (four quads each).
    pub standing: usize,
    /// Doors of any orientation (four quads each).
    pub doors: usize,
}

impl EntityCounts {
    /// Adds `entity` to the matching category.
    pub fn record(&mut self, entity: &Entity) {
        if entity.kind == EntityKind::GLASS {
            self.glass += 1;
        }
        if entity.is_standing() {
            self.standing += 1;
        }
        if entity.kind.is_door() {
            self.doors += 1;
        }
    }
}
