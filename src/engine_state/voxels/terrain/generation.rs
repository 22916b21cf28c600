//! # Terrain Generation
//!
//! Procedural generators for the block grid. Every generator is deterministic for a given
//! seed and writes the grid directly without notifying subscribers.
//!
//! Multiple generation strategies are supported:
//! - Flat: two layers of one block id
//! - Random: columns of random height and random ids
//! - Pyramid: a stepped hollow pyramid on flat ground
//! - Sphere: a hollow half-sphere shell with height-banded textures
//! - Noise: a layered Perlin heightmap with height-based biome bands and trees

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};
use web_time::Instant;

use super::Terrain;
use crate::engine_state::voxels::block::{self, BlockId, EMPTY, WATER};
use crate::engine_state::voxels::grid::VoxelGrid;

/// The method used to populate a fresh terrain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainSource {
    /// Nothing but air
    Empty,
    /// Two layers of grass-like ground
    Flat,
    /// Random column heights and random block ids
    Random,
    /// A stepped pyramid on flat ground
    Pyramid,
    /// A hollow half-sphere shell
    Sphere,
    /// Layered Perlin noise heightmap with biomes and trees
    Noise,
}

/// Favourite textures of the sphere generator, one per height band.
const SPHERE_TEXTURES: [u8; 16] = [0, 1, 4, 5, 6, 9, 11, 12, 15, 16, 17, 18, 32, 33, 34, 4];

/// Block id of the pyramid and its ground.
const PYRAMID_BLOCK: BlockId = 13;

/// Largest upward step of the random generator.
const MAX_SMALL_STEP: i32 = 3;

/// Number of noise octaves summed for the heightmap.
const NOISE_OCTAVES: i32 = 5;

/// Water cells placed before low basins turn into sand.
const MAX_WATER_BLOCKS: usize = 320;

/// Spacing of the tree lattice.
const TREE_SPACING: i32 = 10;
const TREE_TRUNK: BlockId = 10;
const TREE_LEAVES: BlockId = 6;

/// Atlas textures used by the biome bands.
mod tex {
    pub const WATER: u8 = 10;
    pub const SAND: u8 = 12;
    pub const GRASS: u8 = 0;
    pub const DIRT: u8 = 1;
    pub const SNOW: u8 = 6;
    pub const BRIGHT_STONE: u8 = 19;
    pub const DARK_STONE: u8 = 25;
    pub const GOLD_STONE: u8 = 20;
    pub const SAND_BRICKS: u8 = 35;
    pub const STONE_VARIANT: u8 = 33;
}

/// Writes a cell; cells beyond the grid are dropped.
fn put(grid: &mut VoxelGrid, x: i32, y: i32, z: i32, id: BlockId) {
    let _ = grid.set(x, y, z, id);
}

impl Terrain {
    /// Replaces the grid contents with freshly generated terrain.
    ///
    /// # Arguments
    /// * `source` - The generator to run
    /// * `seed` - Seed for the random and noise generators
    pub fn generate(&mut self, source: TerrainSource, seed: u64) {
        let started = Instant::now();
        log::info!("Generating {:?} terrain with seed {}", source, seed);
        match source {
            TerrainSource::Empty => self.clear(),
            TerrainSource::Flat => self.generate_flat(block::block_for_texture(0)),
            TerrainSource::Random => self.generate_random(seed),
            TerrainSource::Pyramid => self.generate_pyramid(),
            TerrainSource::Sphere => self.generate_spherish(),
            TerrainSource::Noise => self.generate_noise(seed),
        }
        log::info!(
            "Generated {:?} terrain in {:?}",
            source,
            started.elapsed()
        );
    }

    /// Clears the grid and fills the two lowest layers with `id`.
    pub fn generate_flat(&mut self, id: BlockId) {
        self.clear();
        let dims = self.dimensions();
        let grid = self.grid_mut();
        for x in 0..dims.x as i32 {
            for z in 0..dims.z as i32 {
                put(grid, x, 0, z, id);
                put(grid, x, 1, z, id);
            }
        }
    }

    /// Fills each column up to a random height around half the world height with random
    /// block ids.
    pub fn generate_random(&mut self, seed: u64) {
        let mut rng = fastrand::Rng::with_seed(seed);
        let dims = self.dimensions();
        let base_height = dims.y as i32 / 2;
        let grid = self.grid_mut();
        for x in 0..dims.x as i32 {
            for z in 0..dims.z as i32 {
                let height = (base_height + rng.i32(-1..=MAX_SMALL_STEP)).clamp(0, dims.y as i32 - 1);
                for y in 0..dims.y as i32 {
                    let id = if y <= height { rng.u8(1..=64) } else { EMPTY };
                    put(grid, x, y, z, id);
                }
            }
        }
    }

    /// Builds a stepped hollow pyramid with a footprint of `Y x Y` cells starting at the
    /// centre of the world, on flat ground.
    pub fn generate_pyramid(&mut self) {
        self.generate_flat(PYRAMID_BLOCK);
        let dims = self.dimensions();
        let side = dims.y as i32;
        let (x_offset, z_offset) = (dims.x as i32 / 2, dims.z as i32 / 2);
        let grid = self.grid_mut();
        for x in 0..side {
            for z in 0..side {
                let height = x.min(side - 1 - x).min(z).min(side - 1 - z);
                put(grid, x + x_offset, 0, z + z_offset, PYRAMID_BLOCK);
                put(grid, x + x_offset, height, z + z_offset, PYRAMID_BLOCK);
            }
        }
    }

    /// Builds a one-layer ground plus a hollow sphere shell around the grid centre, textured
    /// by height band.
    pub fn generate_spherish(&mut self) {
        let dims = self.dimensions();
        let (cx, cy, cz) = (
            (dims.x / 2) as f32,
            (dims.y / 2) as f32,
            (dims.z / 2) as f32,
        );
        let outer = (dims.y / 2) as f32;
        let inner = outer - 2.0;
        let bands = SPHERE_TEXTURES.len();
        let grid = self.grid_mut();
        for x in 0..dims.x {
            for y in 0..dims.y {
                for z in 0..dims.z {
                    let (dx, dy, dz) = (x as f32 - cx, y as f32 - cy, z as f32 - cz);
                    let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                    let id = if y == 0 {
                        1
                    } else if dist > inner && dist < outer {
                        let band = (y * bands / dims.y).min(bands - 1);
                        block::block_for_texture(SPHERE_TEXTURES[band])
                    } else {
                        EMPTY
                    };
                    put(grid, x as i32, y as i32, z as i32, id);
                }
            }
        }
    }

    /// Generates a layered Perlin heightmap over the lower half of the world.
    pub fn generate_noise(&mut self, seed: u64) {
        self.clear();
        let dims = self.dimensions();
        let mut generator = NoiseTerrain::new(seed, dims.y as i32 / 2);
        let grid = self.grid_mut();

        for x in 0..dims.x as i32 {
            for z in 0..dims.z as i32 {
                let height = generator.column_height(x, z);
                let mut top_id = EMPTY;

                for y in 0..generator.max_height {
                    if y > height {
                        continue;
                    }
                    top_id = generator.choose_block_for_height(y, height);
                    put(grid, x, y, z, top_id);

                    if y == height && y > 1 && generator.rng.u32(0..20) == 0 {
                        put(grid, x, y, z, EMPTY);
                        put(grid, x, y - 1, z, top_id);
                    }
                }

                let on_lattice = x % TREE_SPACING == 0 && z % TREE_SPACING == 0;
                if on_lattice
                    && height as f32 >= generator.max_height as f32 * 0.25
                    && top_id != WATER
                {
                    generator.add_tree(grid, x, height, z);
                }
            }
        }
        log::debug!(
            "Noise terrain placed {} water cells",
            generator.water_blocks
        );
    }
}

/// State of one noise terrain generation run.
struct NoiseTerrain {
    rng: fastrand::Rng,
    heightmap: Perlin,
    roughness: Perlin,
    zoom: f64,
    persistence: f64,
    max_height: i32,
    water_blocks: usize,
}

impl NoiseTerrain {
    fn new(seed: u64, max_height: i32) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let variation = rng.u32(..) % 10;
        Self {
            rng,
            heightmap: Perlin::new(seed as u32),
            roughness: Perlin::new((seed as u32).wrapping_add(1)),
            zoom: 90.0 - variation as f64,
            persistence: 0.3 + variation as f64 * 0.01,
            max_height,
            water_blocks: 0,
        }
    }

    /// Column height in `[1, max_height]`.
    fn column_height(&self, x: i32, z: i32) -> i32 {
        let (x, z) = (x as f64, z as f64);
        let mut n = 0.0;
        for octave in 0..NOISE_OCTAVES {
            let freq = 2f64.powi(octave);
            let amp = self.persistence.powi(octave);
            n += self.heightmap.get([x * freq / self.zoom, z * freq / self.zoom]) * amp;
        }

        let half = self.max_height as f64 / 2.0;
        let mut height = (n * half + half) as i32;
        height += (self.roughness.get([x * 4.0 / 60.0, z * 4.0 / 60.0]) * 8.0) as i32;
        height.min(self.max_height).max(1)
    }

    /// Picks the block for height `block_height` of a column `column_height` tall.
    fn choose_block_for_height(&mut self, block_height: i32, column_height: i32) -> BlockId {
        let k = block_height as f32 / column_height as f32;
        let l = block_height as f32 / self.max_height as f32;
        let m = column_height as f32 / self.max_height as f32;
        let jitter = 0.01 * (self.rng.i32(0..5) - 2) as f32;

        let texture = if l >= 0.3 {
            if k <= 0.3 + jitter {
                if self.rng.u32(0..5) == 0 {
                    tex::BRIGHT_STONE
                } else {
                    tex::STONE_VARIANT
                }
            } else if k <= 0.45 + jitter {
                tex::DARK_STONE
            } else if k <= 0.75 + self.rng.u32(0..8) as f32 * 0.01 {
                if self.rng.u32(0..100) == 0 {
                    tex::GOLD_STONE
                } else {
                    tex::BRIGHT_STONE
                }
            } else if k <= 0.9 + jitter {
                tex::DIRT
            } else if self.max_height - column_height < 2 {
                tex::SNOW
            } else if block_height == column_height {
                tex::GRASS
            } else {
                tex::DIRT
            }
        } else if l <= 0.1 && column_height <= 1 {
            self.water_blocks += 1;
            if self.water_blocks <= MAX_WATER_BLOCKS {
                tex::WATER
            } else {
                tex::SAND
            }
        } else if l <= 0.2 + jitter && m < 0.2 {
            if self.rng.u32(0..5) == 0 {
                tex::SAND_BRICKS
            } else {
                tex::SAND
            }
        } else if jitter == 0.0 {
            tex::BRIGHT_STONE
        } else {
            tex::DARK_STONE
        };

        block::block_for_texture(texture)
    }

    /// Plants a tree on top of the column at `(x, z)` whose surface is at `base_y`.
    fn add_tree(&mut self, grid: &mut VoxelGrid, x: i32, base_y: i32, z: i32) {
        if !grid.contains(x - 2, base_y, z - 2) || !grid.contains(x + 2, base_y + 8, z + 2) {
            return;
        }
        if base_y + 8 >= self.max_height {
            return;
        }
        if self.rng.bool() {
            return;
        }

        let trunk_height = self.rng.i32(4..8);
        for i in 1..=trunk_height {
            put(grid, x, base_y + i, z, TREE_TRUNK);
        }

        let crown = base_y + trunk_height;
        for i in -2i32..=2 {
            for j in -2i32..=2 {
                let corner = i.abs() == 2 && j.abs() == 2;
                if (i == 0 && j == 0) || corner {
                    continue;
                }
                put(grid, x + i, crown - 1, z + j, TREE_LEAVES);

                if i.abs() > 1 || j.abs() > 1 || self.rng.u32(0..3) == 0 {
                    continue;
                }
                put(grid, x + i, crown - 2, z + j, TREE_LEAVES);
                put(grid, x + i, crown, z + j, TREE_LEAVES);
            }
        }

        if self.rng.u32(0..5) == 0 {
            return;
        }
        for (dx, dz) in [(-1, 0), (1, 0), (0, -1), (0, 1), (0, 0)] {
            put(grid, x + dx, crown + 1, z + dz, TREE_LEAVES);
        }
    }
}
