//! # Voxel World
//!
//! The voxel data model of the engine.
//!
//! ## Architecture
//!
//! * **Block**: Block ids, their visibility classes and the six cube faces
//! * **Grid**: The dense, bounds-checked block id array
//! * **Entity**: Decorative objects attached to block faces
//! * **Terrain**: Grid plus entities plus change notifications, generators and persistence
//!
//! ## Data Flow
//!
//! 1. Gameplay code edits the terrain through `set`, `lazy_set` or the entity operations
//! 2. The terrain publishes a `BlockChange` for every committed edit
//! 3. The chunk renderer drains its subscription once per frame and rebuilds the affected
//!    chunk meshes and entity batches

pub mod block;
pub mod entity;
pub mod grid;
pub mod terrain;
