//! On-disk fixtures built from synthetic terrain.

use tempfile::TempDir;
use terrain_grid::{GridSource, TerrainGridConfig, TerrainGridWriter};

/// Chunk edge used for fixture grids, small enough that even toy grids
/// span several chunks.
pub const FIXTURE_CHUNK_SIZE: usize = 4;

/// Write a grid set as three Zarr arrays in a fresh temporary directory.
///
/// Returns the directory guard (dropping it deletes the files) and a
/// configuration pointing at the written arrays.
pub fn write_zarr_fixture(grids: &dyn GridSource) -> (TempDir, TerrainGridConfig) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let writer = TerrainGridWriter::new(TerrainGridConfig {
        zarr_chunk_size: FIXTURE_CHUNK_SIZE,
        ..TerrainGridConfig::default()
    });
    let config = writer
        .write_grid_set(dir.path(), grids)
        .expect("write fixture grid set");
    (dir, config)
}

/// A configuration whose grid paths do not exist.
pub fn missing_grid_config(dir: &TempDir) -> TerrainGridConfig {
    TerrainGridConfig {
        dem_path: dir.path().join("absent_dem.zarr"),
        flow_dir_path: dir.path().join("absent_flow_direction.zarr"),
        flow_acc_path: dir.path().join("absent_flow_accumulation.zarr"),
        ..TerrainGridConfig::default()
    }
}
