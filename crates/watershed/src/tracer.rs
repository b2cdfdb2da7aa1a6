//! Upstream tracing over the flow-direction grid.
//!
//! A breadth-first inverse flood fill: starting from the outlet, a
//! neighbour joins the watershed when its own flow direction points at a
//! cell already in the watershed.
//!
//! # Architecture
//!
//! ```text
//! trace(target)
//!      │
//!      ├─► queue = [target], visited = {target}
//!      │
//!      └─► pop cell ─► for each of 8 neighbours
//!                          │
//!                          ├─► flow-direction tile loaded? else read it
//!                          │
//!                          └─► neighbour drains into cell? ─► visit, enqueue
//! ```
//!
//! Flow directions are read in square tiles as the search reaches them, so
//! the working set stays proportional to the watershed, not the grid.

use std::collections::{HashMap, VecDeque};

use terrain_grid::{GridLayer, GridSource, Pixel};
use tracing::{debug, instrument};

use crate::d8::{D8Encoding, Direction};
use crate::error::{DelineationError, Result};
use crate::mask::CellMask;
use crate::tiles::{LayerTiles, DEFAULT_TILE_SIZE};

/// Traces the contributing area of a cell.
#[derive(Debug, Clone, Copy)]
pub struct UpstreamTracer {
    encoding: D8Encoding,
    tile_size: usize,
    max_cells: usize,
}

impl UpstreamTracer {
    pub fn new(encoding: D8Encoding, max_cells: usize) -> Self {
        Self {
            encoding,
            tile_size: DEFAULT_TILE_SIZE,
            max_cells,
        }
    }

    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size.max(1);
        self
    }

    pub fn encoding(&self) -> D8Encoding {
        self.encoding
    }

    /// Every cell whose flow reaches `target`, `target` included.
    ///
    /// Fails with `ResultTooLarge` once the watershed would exceed the cell
    /// ceiling (never more than the grid size), and with `OutOfCoverage`
    /// when `target` is outside the grid.
    #[instrument(skip(self, grid), fields(col = target.col, row = target.row))]
    pub fn trace(&self, grid: &dyn GridSource, target: Pixel) -> Result<CellMask> {
        let meta = grid.metadata();
        if target.col >= meta.width || target.row >= meta.height {
            return Err(DelineationError::out_of_coverage(format!(
                "pixel ({}, {}) is outside the {}x{} grid",
                target.col, target.row, meta.width, meta.height
            )));
        }

        let limit = self.max_cells.min(meta.cell_count());
        let mut tiles = LayerTiles::new(grid, GridLayer::FlowDirection, self.tile_size);
        let mut visited = VisitedTiles::new(self.tile_size);
        let mut cells = vec![target];
        let mut queue = VecDeque::from([target]);
        visited.insert(target);

        while let Some(cell) = queue.pop_front() {
            for dir in Direction::ALL {
                let (dc, dr) = dir.offset();
                let (nc, nr) = (cell.col as i64 + dc, cell.row as i64 + dr);
                if !meta.contains(nc, nr) {
                    continue;
                }
                let neighbour = Pixel::new(nc as usize, nr as usize);
                if visited.contains(neighbour) {
                    continue;
                }

                // The neighbour contributes when it flows back towards `cell`
                let drains_here = tiles
                    .value(neighbour)?
                    .and_then(|code| self.encoding.decode(code))
                    == Some(dir.opposite());
                if !drains_here {
                    continue;
                }

                if cells.len() >= limit {
                    return Err(DelineationError::result_too_large(format!(
                        "watershed exceeds {} cells",
                        limit
                    )));
                }
                visited.insert(neighbour);
                cells.push(neighbour);
                queue.push_back(neighbour);
            }
        }

        debug!(
            cells = cells.len(),
            tiles_read = tiles.tiles_read(),
            "Upstream trace complete"
        );
        Ok(CellMask::from_cells(&cells))
    }
}

/// Visited bitmap split into tiles, allocated as the search reaches them.
struct VisitedTiles {
    tile_size: usize,
    index: HashMap<(usize, usize), usize>,
    arena: Vec<Vec<u64>>,
}

impl VisitedTiles {
    fn new(tile_size: usize) -> Self {
        Self {
            tile_size,
            index: HashMap::new(),
            arena: Vec::new(),
        }
    }

    fn locate(&self, pixel: Pixel) -> ((usize, usize), usize) {
        let key = (pixel.col / self.tile_size, pixel.row / self.tile_size);
        let bit = (pixel.row % self.tile_size) * self.tile_size + pixel.col % self.tile_size;
        (key, bit)
    }

    fn contains(&self, pixel: Pixel) -> bool {
        let (key, bit) = self.locate(pixel);
        self.index
            .get(&key)
            .map_or(false, |&slot| self.arena[slot][bit / 64] & (1u64 << (bit % 64)) != 0)
    }

    fn insert(&mut self, pixel: Pixel) {
        let (key, bit) = self.locate(pixel);
        let words = (self.tile_size * self.tile_size).div_ceil(64);
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.arena.push(vec![0; words]);
                self.index.insert(key, self.arena.len() - 1);
                self.arena.len() - 1
            }
        };
        self.arena[slot][bit / 64] |= 1u64 << (bit % 64);
    }
}
