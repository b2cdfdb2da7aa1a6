//! Read-only readiness probe for the configured grids.

use serde::Serialize;

use crate::config::TerrainGridConfig;
use crate::source::zarr::open_filesystem_layer;
use crate::types::GridLayer;

/// Availability of one grid.
#[derive(Debug, Clone, Serialize)]
pub struct GridStatus {
    pub layer: GridLayer,
    pub path: String,
    pub exists: bool,
    pub readable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Availability of all three grids.
#[derive(Debug, Clone, Serialize)]
pub struct GridSetStatus {
    pub grids: Vec<GridStatus>,
    pub ready: bool,
}

/// Check that each configured grid exists and that its metadata opens and
/// its attributes parse. Reads no cell data.
pub fn probe_grids(config: &TerrainGridConfig) -> GridSetStatus {
    let grids: Vec<GridStatus> = GridLayer::ALL
        .iter()
        .map(|&layer| {
            let path = config.path_for(layer);
            let exists = path.exists();
            let (readable, error) = if exists {
                match open_filesystem_layer(path) {
                    Ok(_) => (true, None),
                    Err(e) => (false, Some(e.to_string())),
                }
            } else {
                (false, Some("file not found".to_string()))
            };
            GridStatus {
                layer,
                path: path.display().to_string(),
                exists,
                readable,
                error,
            }
        })
        .collect();

    let ready = grids.iter().all(|g| g.readable);
    GridSetStatus { grids, ready }
}
