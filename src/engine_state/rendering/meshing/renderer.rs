//! Chunk streaming and frame orchestration.
//!
//! `ChunkMeshRenderer` keeps one optional slot per chunk column, each holding the chunk's
//! block mesh and entity batch. Slots are allocated around the viewer out to the view
//! distance and freed beyond it, a bounded number per scheduling interval, nearest rings
//! first. Terrain edits reach the renderer through its change subscription and are turned
//! into targeted rebuilds at the start of the next frame.
//!
//! # Frame order
//! 1. One pending lighting refresh, if its interval has elapsed
//! 2. Dirty chunks from terrain edits
//! 3. Scheduled allocations, then scheduled frees, under the interval budget
//! 4. Chunk meshes of every allocated, adjacent chunk that is visible
//! 5. Entity batches of the chunks drawn in step 4, inside one entity pass

use std::collections::VecDeque;

use cgmath::Point3;
use web_time::Duration;

use super::chunk_mesh::{ChunkMesh, MeshingContext};
use super::entity_batch::EntityBatch;
use super::ChunkFootprint;
use crate::core::Subscription;
use crate::engine_state::camera_state::CameraView;
use crate::engine_state::config::EngineConfig;
use crate::engine_state::rendering::{RailTextureSource, RenderSink, UniformRails, Vertex};
use crate::engine_state::simulation::SimulationContext;
use crate::engine_state::voxels::terrain::{BlockChange, Terrain};

/// Column coordinates of a chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkIndex {
    pub x: i32,
    pub z: i32,
}

impl ChunkIndex {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chebyshev distance in chunks.
    pub fn distance(&self, other: ChunkIndex) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

/// Counters for what the scheduler has done since construction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Budgeted allocations.
    pub allocations: usize,
    /// Budgeted frees.
    pub frees: usize,
    /// Allocations of the viewer's own chunk, which bypass the budget.
    pub forced_allocations: usize,
    /// Chunk mesh rebuilds caused by terrain edits.
    pub mesh_rebuilds: usize,
    /// Entity batch rebuilds caused by entity edits.
    pub entity_rebuilds: usize,
    /// Dirty chunks dropped because they were not allocated.
    pub skipped_dirty: usize,
    /// Lighting-only refreshes after daylight changes.
    pub light_refreshes: usize,
}

/// A chunk waiting for a rebuild.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct DirtyChunk {
    chunk: ChunkIndex,
    entity_update: bool,
    /// Height of the change; `None` rebuilds every band.
    y: Option<i32>,
}

struct ChunkSlot {
    mesh: ChunkMesh,
    entities: EntityBatch,
}

/// Streams chunk meshes in and out around the viewer and draws them.
pub struct ChunkMeshRenderer {
    chunk_size: i32,
    chunks_x: i32,
    chunks_z: i32,
    band_count: usize,
    view_distance: i32,
    keep_meshes: bool,

    slots: Vec<Option<ChunkSlot>>,
    dirty: Vec<DirtyChunk>,
    to_allocate: VecDeque<ChunkIndex>,
    to_free: VecDeque<ChunkIndex>,
    light_refresh: VecDeque<ChunkIndex>,
    changes: Subscription<BlockChange>,

    budget: usize,
    changes_in_interval: usize,
    update_interval: Duration,
    startup_burst: Duration,
    last_interval_reset: Option<Duration>,
    light_refresh_interval: Duration,
    last_light_refresh: Option<Duration>,
    band_build_cooldown: Duration,

    viewer_chunk: Option<ChunkIndex>,
    scratch: Vec<Vertex>,
    rails: Box<dyn RailTextureSource>,
    stats: SchedulerStats,
}

impl ChunkMeshRenderer {
    /// Creates a renderer for `terrain` and subscribes to its changes.
    ///
    /// With `keep_meshes` set, every chunk is allocated and fully built here and the
    /// renderer never streams.
    ///
    /// # Arguments
    /// * `config` - Validated engine configuration
    /// * `terrain` - The terrain to mesh
    /// * `sim` - Daylight used by up-front meshes
    /// * `now` - Engine time used as the build time of up-front meshes
    pub fn new(
        config: &EngineConfig,
        terrain: &mut Terrain,
        sim: &SimulationContext,
        now: Duration,
    ) -> Self {
        let changes = terrain.subscribe();
        let chunks_x = config.chunks_x() as i32;
        let chunks_z = config.chunks_z() as i32;

        let mut renderer = Self {
            chunk_size: config.chunk_size as i32,
            chunks_x,
            chunks_z,
            band_count: config.bands(),
            view_distance: config.view_distance(),
            keep_meshes: config.keep_meshes,
            slots: (0..chunks_x * chunks_z).map(|_| None).collect(),
            dirty: Vec::new(),
            to_allocate: VecDeque::new(),
            to_free: VecDeque::new(),
            light_refresh: VecDeque::new(),
            changes,
            budget: config.max_chunk_updates,
            changes_in_interval: 0,
            update_interval: config.chunk_update_interval(),
            startup_burst: config.startup_burst(),
            last_interval_reset: None,
            light_refresh_interval: config.light_refresh_interval(),
            last_light_refresh: None,
            band_build_cooldown: config.band_build_cooldown(),
            viewer_chunk: None,
            scratch: Vec::new(),
            rails: Box::new(UniformRails),
            stats: SchedulerStats::default(),
        };

        if renderer.keep_meshes {
            renderer.allocate_everything(&MeshingContext::new(terrain, sim, now));
        }
        renderer
    }

    fn allocate_everything(&mut self, ctx: &MeshingContext) {
        for x in 0..self.chunks_x {
            for z in 0..self.chunks_z {
                self.allocate(ChunkIndex::new(x, z), ctx);
            }
        }
        log::info!(
            "Built {} chunk meshes up front ({} vertices)",
            self.allocated_count(),
            self.total_vertices()
        );
    }

    /// Replaces the rail texturing strategy. Existing batches keep their geometry until
    /// they are rebuilt.
    pub fn set_rail_texture_source(&mut self, rails: Box<dyn RailTextureSource>) {
        self.rails = rails;
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Allocations and frees spent from the current interval's budget.
    pub fn changes_in_interval(&self) -> usize {
        self.changes_in_interval
    }

    pub fn view_distance(&self) -> i32 {
        self.view_distance
    }

    /// The chunk the viewer was last seen in.
    pub fn viewer_chunk(&self) -> Option<ChunkIndex> {
        self.viewer_chunk
    }

    pub fn is_allocated(&self, x: i32, z: i32) -> bool {
        self.slot_index(ChunkIndex::new(x, z))
            .is_some_and(|i| self.slots[i].is_some())
    }

    pub fn allocated_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Coordinates of every allocated chunk, in x-major order.
    pub fn allocated_chunks(&self) -> Vec<ChunkIndex> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| self.index_to_chunk(i))
            .collect()
    }

    pub fn chunk_mesh(&self, x: i32, z: i32) -> Option<&ChunkMesh> {
        self.slot(ChunkIndex::new(x, z)).map(|s| &s.mesh)
    }

    pub fn entity_batch(&self, x: i32, z: i32) -> Option<&EntityBatch> {
        self.slot(ChunkIndex::new(x, z)).map(|s| &s.entities)
    }

    pub fn pending_allocations(&self) -> usize {
        self.to_allocate.len()
    }

    pub fn pending_frees(&self) -> usize {
        self.to_free.len()
    }

    pub fn pending_light_refreshes(&self) -> usize {
        self.light_refresh.len()
    }

    pub fn pending_dirty(&self) -> usize {
        self.dirty.len()
    }

    /// Vertices held by every allocated chunk mesh and entity batch.
    pub fn total_vertices(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .map(|s| s.mesh.vertex_count() + s.entities.vertices().len())
            .sum()
    }

    /// Drops every slot and every pending request. Used after the terrain was replaced.
    pub fn free_all_meshes(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.dirty.clear();
        self.to_allocate.clear();
        self.to_free.clear();
        self.light_refresh.clear();
        self.changes.drain();
        self.viewer_chunk = None;
        self.last_interval_reset = None;
        self.changes_in_interval = 0;
    }

    /// Starts over after the terrain was replaced wholesale: every slot is dropped and, when
    /// meshes are kept, rebuilt from the current terrain.
    pub fn reset(&mut self, ctx: &MeshingContext) {
        self.free_all_meshes();
        if self.keep_meshes {
            self.allocate_everything(ctx);
        }
    }

    /// Reacts to the viewer moving to `position`.
    ///
    /// The chunk containing the viewer is allocated on the spot. Every other chunk within
    /// the view distance that is missing is queued for allocation, and every allocated
    /// chunk on the ring just beyond it is queued for freeing. Rings are walked from near to
    /// far so the queues fill nearest first. Nothing happens when meshes are kept.
    pub fn on_viewer_moved(&mut self, position: Point3<f32>, ctx: &MeshingContext) {
        if self.keep_meshes {
            return;
        }
        let center = self.chunk_of(position);
        if self.slot_index(center).is_none() {
            log::debug!("Viewer at {:?} is outside the terrain", position);
            return;
        }
        self.viewer_chunk = Some(center);

        if !self.is_allocated(center.x, center.z) {
            self.allocate(center, ctx);
            self.stats.forced_allocations += 1;
        }

        for k in 1..=self.view_distance + 1 {
            // columns on the left and right edge of the ring
            for x in [center.x - k, center.x + k] {
                for z in center.z - k..=center.z + k {
                    self.manage_chunk(ChunkIndex::new(x, z), k);
                }
            }
            // the rest of the top and bottom edge
            for z in [center.z - k, center.z + k] {
                for x in center.x - (k - 1)..=center.x + (k - 1) {
                    self.manage_chunk(ChunkIndex::new(x, z), k);
                }
            }
        }
    }

    /// Queues a lighting refresh of every allocated chunk and tells the sink.
    ///
    /// Chunks still waiting from an earlier change keep their place in the queue.
    pub fn on_daylight_changed(&mut self, factor: f32, sink: &mut dyn RenderSink) {
        let allocated = self.allocated_chunks();
        log::debug!(
            "Daylight now {:.2}, relighting {} chunks",
            factor,
            allocated.len()
        );
        for chunk in allocated {
            if !self.light_refresh.contains(&chunk) {
                self.light_refresh.push_back(chunk);
            }
        }
        sink.daylight_changed(factor);
    }

    /// Runs one frame: pending rebuilds, scheduling, then drawing.
    pub fn render<C: CameraView + ?Sized>(
        &mut self,
        camera: &C,
        ctx: &MeshingContext,
        sink: &mut dyn RenderSink,
    ) {
        self.refresh_lighting(ctx);

        for change in self.changes.drain() {
            self.register_change(change);
        }
        self.flush_dirty(ctx);

        let camera_pos = camera.position();
        let viewer = self.chunk_of(camera_pos);
        self.update_chunks(viewer, ctx);

        let frustum = camera.frustum();
        let camera_y = camera_pos.y as i32;
        let mut drawn = Vec::new();
        for x in 0..self.chunks_x {
            for z in 0..self.chunks_z {
                let chunk = ChunkIndex::new(x, z);
                if !self.is_adjacent(chunk, viewer) {
                    continue;
                }
                let Some(i) = self.slot_index(chunk) else {
                    continue;
                };
                let Some(slot) = self.slots[i].as_mut() else {
                    continue;
                };
                let bbox = slot.mesh.bounding_box();
                if bbox.contains(camera_pos) || frustum.contains_box(bbox) {
                    slot.mesh.render(camera_y, ctx, &mut self.scratch, sink);
                    sink.render_animals_in_chunk(x, z);
                    drawn.push(i);
                }
            }
        }

        let batches: Vec<&EntityBatch> = drawn
            .iter()
            .filter_map(|&i| self.slots[i].as_ref())
            .map(|s| &s.entities)
            .filter(|b| !b.is_empty())
            .collect();
        if !batches.is_empty() {
            sink.begin_entity_pass();
            for batch in batches {
                batch.render(sink);
            }
            sink.end_entity_pass();
        }
    }

    /// Marks the chunk owning a changed cell as dirty, plus the chunk across the border if
    /// the cell sits on one. Diagonal neighbours are never affected.
    fn register_change(&mut self, change: BlockChange) {
        let BlockChange { pos, entity_update } = change;
        if pos.x < 0 || pos.z < 0 {
            return;
        }
        let size = self.chunk_size;
        let chunk = ChunkIndex::new(pos.x / size, pos.z / size);
        if self.slot_index(chunk).is_none() {
            return;
        }
        let y = Some(pos.y);
        self.add_dirty(chunk, entity_update, y);

        let (dx, dz) = (pos.x % size, pos.z % size);
        if dx == 0 && chunk.x > 0 {
            self.add_dirty(ChunkIndex::new(chunk.x - 1, chunk.z), entity_update, y);
        } else if dx == size - 1 && chunk.x + 1 < self.chunks_x {
            self.add_dirty(ChunkIndex::new(chunk.x + 1, chunk.z), entity_update, y);
        }
        if dz == 0 && chunk.z > 0 {
            self.add_dirty(ChunkIndex::new(chunk.x, chunk.z - 1), entity_update, y);
        } else if dz == size - 1 && chunk.z + 1 < self.chunks_z {
            self.add_dirty(ChunkIndex::new(chunk.x, chunk.z + 1), entity_update, y);
        }
    }

    /// One entry per chunk and update kind. A second change at another height widens the
    /// entry to a full rebuild.
    fn add_dirty(&mut self, chunk: ChunkIndex, entity_update: bool, y: Option<i32>) {
        let existing = self
            .dirty
            .iter_mut()
            .find(|d| d.chunk == chunk && d.entity_update == entity_update);
        match existing {
            Some(entry) => {
                if entry.y != y {
                    entry.y = None;
                }
            }
            None => self.dirty.push(DirtyChunk {
                chunk,
                entity_update,
                y,
            }),
        }
    }

    fn flush_dirty(&mut self, ctx: &MeshingContext) {
        for entry in std::mem::take(&mut self.dirty) {
            let Some(i) = self.slot_index(entry.chunk) else {
                continue;
            };
            let Some(slot) = self.slots[i].as_mut() else {
                self.stats.skipped_dirty += 1;
                continue;
            };
            if entry.entity_update {
                slot.entities.update(ctx, self.rails.as_ref(), &mut self.scratch);
                self.stats.entity_rebuilds += 1;
            } else {
                slot.mesh.update(entry.y, ctx, &mut self.scratch);
                self.stats.mesh_rebuilds += 1;
            }
        }
    }

    fn refresh_lighting(&mut self, ctx: &MeshingContext) {
        if self.light_refresh.is_empty() {
            return;
        }
        let due = self
            .last_light_refresh
            .map_or(true, |last| ctx.now.saturating_sub(last) > self.light_refresh_interval);
        if !due {
            return;
        }
        let Some(chunk) = self.light_refresh.pop_front() else {
            return;
        };
        if let Some(slot) = self.slot_index(chunk).and_then(|i| self.slots[i].as_mut()) {
            slot.mesh.update(None, ctx, &mut self.scratch);
            slot.entities.update(ctx, self.rails.as_ref(), &mut self.scratch);
            self.stats.light_refreshes += 1;
        }
        self.last_light_refresh = Some(ctx.now);
    }

    /// Executes scheduled allocations, then frees, until the interval budget is spent.
    /// Requests whose chunk no longer needs them are dropped without cost.
    fn update_chunks(&mut self, viewer: ChunkIndex, ctx: &MeshingContext) {
        let interval_over = self
            .last_interval_reset
            .map_or(true, |last| ctx.now.saturating_sub(last) >= self.update_interval);
        if interval_over || ctx.now < self.startup_burst {
            self.changes_in_interval = 0;
            self.last_interval_reset = Some(ctx.now);
        }

        while let Some(&chunk) = self.to_allocate.front() {
            if self.changes_in_interval >= self.budget {
                return;
            }
            self.to_allocate.pop_front();
            if !self.is_allocated(chunk.x, chunk.z) && self.is_adjacent(chunk, viewer) {
                self.allocate(chunk, ctx);
                self.changes_in_interval += 1;
                self.stats.allocations += 1;
            }
        }

        while let Some(&chunk) = self.to_free.front() {
            if self.changes_in_interval >= self.budget {
                return;
            }
            self.to_free.pop_front();
            if self.is_allocated(chunk.x, chunk.z) && !self.is_adjacent(chunk, viewer) {
                if let Some(i) = self.slot_index(chunk) {
                    self.slots[i] = None;
                }
                self.changes_in_interval += 1;
                self.stats.frees += 1;
                log::trace!("Freed chunk ({}, {})", chunk.x, chunk.z);
            }
        }
    }

    fn manage_chunk(&mut self, chunk: ChunkIndex, ring: i32) {
        if self.slot_index(chunk).is_none() {
            return;
        }
        let allocated = self.is_allocated(chunk.x, chunk.z);
        if ring <= self.view_distance {
            if !allocated {
                self.to_allocate.push_back(chunk);
            }
        } else if allocated {
            self.to_free.push_back(chunk);
        }
    }

    fn allocate(&mut self, chunk: ChunkIndex, ctx: &MeshingContext) {
        let Some(i) = self.slot_index(chunk) else {
            return;
        };
        let footprint = ChunkFootprint::for_chunk(chunk.x, chunk.z, self.chunk_size);
        let mut mesh = ChunkMesh::new(
            footprint,
            self.chunk_size as usize,
            self.band_count,
            self.band_build_cooldown,
        );
        if self.keep_meshes {
            mesh.build_all(ctx, &mut self.scratch);
        }
        let mut entities = EntityBatch::new(footprint);
        entities.update(ctx, self.rails.as_ref(), &mut self.scratch);

        self.slots[i] = Some(ChunkSlot { mesh, entities });
        log::trace!("Allocated chunk ({}, {})", chunk.x, chunk.z);
    }

    fn is_adjacent(&self, chunk: ChunkIndex, viewer: ChunkIndex) -> bool {
        chunk.distance(viewer) <= self.view_distance
    }

    fn chunk_of(&self, position: Point3<f32>) -> ChunkIndex {
        ChunkIndex::new(
            (position.x.floor() as i32).div_euclid(self.chunk_size),
            (position.z.floor() as i32).div_euclid(self.chunk_size),
        )
    }

    fn slot_index(&self, chunk: ChunkIndex) -> Option<usize> {
        let inside = (0..self.chunks_x).contains(&chunk.x) && (0..self.chunks_z).contains(&chunk.z);
        inside.then(|| (chunk.x * self.chunks_z + chunk.z) as usize)
    }

    fn index_to_chunk(&self, i: usize) -> ChunkIndex {
        let i = i as i32;
        ChunkIndex::new(i / self.chunks_z, i % self.chunks_z)
    }

    fn slot(&self, chunk: ChunkIndex) -> Option<&ChunkSlot> {
        self.slot_index(chunk).and_then(|i| self.slots[i].as_ref())
    }
}
