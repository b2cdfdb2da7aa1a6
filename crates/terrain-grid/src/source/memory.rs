//! In-memory grid set.
//!
//! Holds all three layers as plain vectors. Used for synthetic terrain in
//! tests and benchmarks, and for small grids that fit comfortably in RAM.

use std::collections::HashMap;

use projection::CrsCode;

use crate::error::{GridError, Result};
use crate::types::{GeoTransform, GridLayer, GridMetadata, GridWindow, PixelWindow};

use super::GridSource;

#[derive(Debug, Clone)]
struct MemoryLayer {
    values: Vec<f32>,
    nodata: Option<f32>,
}

/// Aligned grid set backed by vectors.
#[derive(Debug, Clone)]
pub struct MemoryGridSet {
    metadata: GridMetadata,
    layers: HashMap<GridLayer, MemoryLayer>,
}

impl MemoryGridSet {
    /// Create a grid set whose layers are all nodata until set.
    pub fn new(width: usize, height: usize, transform: GeoTransform, crs: CrsCode) -> Self {
        Self {
            metadata: GridMetadata {
                width,
                height,
                transform,
                crs,
                chunk_shape: (width.max(1), height.max(1)),
            },
            layers: HashMap::new(),
        }
    }

    /// Set the values of one layer (row-major, north to south).
    pub fn with_layer(
        mut self,
        layer: GridLayer,
        values: Vec<f32>,
        nodata: Option<f32>,
    ) -> Result<Self> {
        let expected = self.metadata.cell_count();
        if values.len() != expected {
            return Err(GridError::invalid_metadata(format!(
                "{} layer has {} values, expected {}",
                layer,
                values.len(),
                expected
            )));
        }
        self.layers.insert(layer, MemoryLayer { values, nodata });
        Ok(self)
    }

    /// Full values of a layer, if set.
    pub fn layer_values(&self, layer: GridLayer) -> Option<&[f32]> {
        self.layers.get(&layer).map(|l| l.values.as_slice())
    }
}

impl GridSource for MemoryGridSet {
    fn metadata(&self) -> &GridMetadata {
        &self.metadata
    }

    fn nodata(&self, layer: GridLayer) -> Option<f32> {
        self.layers.get(&layer).and_then(|l| l.nodata)
    }

    fn read_window(&self, layer: GridLayer, window: PixelWindow) -> Result<GridWindow> {
        let window = window.clip(self.metadata.width, self.metadata.height);
        let Some(source) = self.layers.get(&layer) else {
            return Ok(GridWindow::new(window, vec![f32::NAN; window.len()], None));
        };

        let mut data = Vec::with_capacity(window.len());
        for row in window.row..window.end_row() {
            let start = row * self.metadata.width + window.col;
            data.extend_from_slice(&source.values[start..start + window.width]);
        }
        Ok(GridWindow::new(window, data, source.nodata))
    }
}
