//! Square tiles of one grid layer, read as a computation reaches them.

use std::collections::HashMap;

use terrain_grid::{GridLayer, GridSource, GridWindow, Pixel, PixelWindow};

use crate::error::Result;

/// Default edge length of grid tiles.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Tiles of a single layer, cached once read.
pub(crate) struct LayerTiles<'a> {
    grid: &'a dyn GridSource,
    layer: GridLayer,
    tile_size: usize,
    tiles: HashMap<(usize, usize), GridWindow>,
}

impl<'a> LayerTiles<'a> {
    pub(crate) fn new(grid: &'a dyn GridSource, layer: GridLayer, tile_size: usize) -> Self {
        Self {
            grid,
            layer,
            tile_size: tile_size.max(1),
            tiles: HashMap::new(),
        }
    }

    /// Tile holding a cell, as (tile column, tile row).
    pub(crate) fn key(&self, pixel: Pixel) -> (usize, usize) {
        (pixel.col / self.tile_size, pixel.row / self.tile_size)
    }

    /// Read one tile without keeping it.
    pub(crate) fn read(&self, key: (usize, usize)) -> Result<GridWindow> {
        let window = PixelWindow::new(
            key.0 * self.tile_size,
            key.1 * self.tile_size,
            self.tile_size,
            self.tile_size,
        );
        Ok(self.grid.read_window(self.layer, window)?)
    }

    /// Valid value of a cell, `None` for nodata.
    pub(crate) fn value(&mut self, pixel: Pixel) -> Result<Option<f32>> {
        let key = self.key(pixel);
        if !self.tiles.contains_key(&key) {
            let tile = self.read(key)?;
            self.tiles.insert(key, tile);
        }
        Ok(self
            .tiles
            .get(&key)
            .and_then(|tile| tile.get(pixel.col, pixel.row)))
    }

    pub(crate) fn tiles_read(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::south_flowing;

    #[test]
    fn test_tiles_read_on_demand() {
        let grids = south_flowing(10).build();
        let mut tiles = LayerTiles::new(&grids, GridLayer::Elevation, 4);

        assert_eq!(tiles.key(Pixel::new(9, 3)), (2, 0));
        assert_eq!(tiles.value(Pixel::new(0, 0)).unwrap(), Some(100.0));
        assert_eq!(tiles.value(Pixel::new(3, 3)).unwrap(), Some(70.0));
        assert_eq!(tiles.tiles_read(), 1);

        // Edge tiles run past the grid and clip to it
        assert_eq!(tiles.value(Pixel::new(9, 9)).unwrap(), Some(10.0));
        assert_eq!(tiles.tiles_read(), 2);
    }
}
