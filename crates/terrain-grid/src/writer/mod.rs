//! Writers for producing terrain grids in Zarr V3 format.

mod zarr_writer;

pub use zarr_writer::{GridWriteResult, TerrainGridWriter};
