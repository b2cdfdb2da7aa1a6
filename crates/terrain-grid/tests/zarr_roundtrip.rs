//! Integration test: write terrain grids to Zarr and read them back through
//! `ZarrGridSet`.

use std::sync::Arc;

use projection::CrsCode;
use terrain_grid::{
    ChunkCache, GeoTransform, GridError, GridLayer, GridSource, MemoryGridSet, PixelWindow,
    TerrainGridConfig, TerrainGridWriter, ZarrCompression, ZarrGridSet, ZarrLayer,
};
use zarrs_filesystem::FilesystemStore;

/// Value at (col, row) = col * 1000 + row (for easy verification)
fn create_test_data(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

fn test_grid(width: usize, height: usize) -> MemoryGridSet {
    let transform = GeoTransform::north_up(-77.1, 38.95, 0.001, 0.001);
    MemoryGridSet::new(width, height, transform, CrsCode::Epsg4326)
        .with_layer(GridLayer::Elevation, create_test_data(width, height), Some(-9999.0))
        .unwrap()
        .with_layer(GridLayer::FlowDirection, vec![4.0; width * height], Some(255.0))
        .unwrap()
        .with_layer(
            GridLayer::FlowAccumulation,
            (0..width * height).map(|i| (i % 7 + 1) as f32).collect(),
            None,
        )
        .unwrap()
}

fn writer_config(compression: ZarrCompression) -> TerrainGridConfig {
    TerrainGridConfig {
        zarr_chunk_size: 8,
        zarr_compression: compression,
        ..TerrainGridConfig::default()
    }
}

#[test]
fn test_zarr_roundtrip_grid_set() {
    let width = 30;
    let height = 20;
    let source = test_grid(width, height);

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let writer = TerrainGridWriter::new(writer_config(ZarrCompression::BloscZstd));
    let config = writer
        .write_grid_set(temp_dir.path(), &source)
        .expect("Failed to write grids");

    let grids = ZarrGridSet::open_with_config(&config).expect("Failed to open grids");

    let meta = grids.metadata();
    assert_eq!(meta.width, width);
    assert_eq!(meta.height, height);
    assert_eq!(meta.crs, CrsCode::Epsg4326);
    assert_eq!(meta.chunk_shape, (8, 8));
    assert!(meta.transform.approx_eq(&source.metadata().transform));

    assert_eq!(grids.nodata(GridLayer::Elevation), Some(-9999.0));
    assert_eq!(grids.nodata(GridLayer::FlowDirection), Some(255.0));
    assert_eq!(grids.nodata(GridLayer::FlowAccumulation), None);

    // Full grid matches
    let full = grids
        .read_window(GridLayer::Elevation, meta.full_window())
        .expect("Failed to read full grid");
    assert_eq!(full.data, create_test_data(width, height));

    // Window spanning four chunks
    let window = PixelWindow::new(5, 6, 7, 5);
    let part = grids
        .read_window(GridLayer::Elevation, window)
        .expect("Failed to read window");
    assert_eq!(part.window, window);
    for row in 6..11 {
        for col in 5..12 {
            assert_eq!(part.get(col, row), Some((col * 1000 + row) as f32));
        }
    }

    let acc = grids.value_at(GridLayer::FlowAccumulation, 29, 19).unwrap();
    assert_eq!(acc, Some(((19 * width + 29) % 7 + 1) as f32));
}

#[test]
fn test_zarr_window_clipped_at_edges() {
    let source = test_grid(10, 9);
    let temp_dir = tempfile::tempdir().unwrap();
    let config = TerrainGridWriter::new(writer_config(ZarrCompression::None))
        .write_grid_set(temp_dir.path(), &source)
        .unwrap();
    let grids = ZarrGridSet::open_with_config(&config).unwrap();

    let w = grids
        .read_window(GridLayer::Elevation, PixelWindow::new(7, 6, 10, 10))
        .unwrap();
    assert_eq!(w.window, PixelWindow::new(7, 6, 3, 3));
    assert_eq!(w.get(9, 8), Some(9008.0));

    let empty = grids
        .read_window(GridLayer::Elevation, PixelWindow::new(20, 20, 2, 2))
        .unwrap();
    assert!(empty.data.is_empty());
}

#[test]
fn test_zarr_chunk_cache_reused() {
    let source = test_grid(16, 16);
    let temp_dir = tempfile::tempdir().unwrap();
    let config = TerrainGridWriter::new(writer_config(ZarrCompression::BloscLz4))
        .write_grid_set(temp_dir.path(), &source)
        .unwrap();

    let cache = ChunkCache::shared(1024 * 1024);
    let grids = ZarrGridSet::open_filesystem(&config, cache.clone()).unwrap();

    let window = PixelWindow::new(0, 0, 16, 16);
    grids.read_window(GridLayer::FlowDirection, window).unwrap();
    let after_first = cache.lock().unwrap().stats();
    assert_eq!(after_first.misses, 4);
    assert_eq!(after_first.entries, 4);

    grids.read_window(GridLayer::FlowDirection, window).unwrap();
    let after_second = cache.lock().unwrap().stats();
    assert_eq!(after_second.hits, 4);
    assert_eq!(after_second.misses, 4);
}

#[test]
fn test_misaligned_grids_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let writer = TerrainGridWriter::new(writer_config(ZarrCompression::None));

    let a = test_grid(10, 10);
    let config_a = writer.write_grid_set(&temp_dir.path().join("a"), &a).unwrap();
    let b = test_grid(12, 10);
    let config_b = writer.write_grid_set(&temp_dir.path().join("b"), &b).unwrap();

    let open = |path: &std::path::Path| {
        ZarrLayer::open(FilesystemStore::new(path).unwrap(), "/", &path.display().to_string())
            .unwrap()
    };

    let result = ZarrGridSet::from_layers(
        open(&config_a.dem_path),
        open(&config_b.flow_dir_path),
        open(&config_a.flow_acc_path),
        Arc::new(std::sync::Mutex::new(ChunkCache::new(1024))),
    );
    assert!(matches!(result, Err(GridError::Misaligned(_))));
}

#[test]
fn test_missing_geo_transform_rejected() {
    use zarrs::array::{ArrayBuilder, DataType, FillValue};

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("bare.zarr");
    std::fs::create_dir_all(&path).unwrap();
    let store = Arc::new(FilesystemStore::new(&path).unwrap());

    let array = ArrayBuilder::new(
        vec![4, 4],
        DataType::Float32,
        vec![4u64, 4].try_into().unwrap(),
        FillValue::from(f32::NAN),
    )
    .build(store, "/")
    .unwrap();
    array.store_metadata().unwrap();

    let result = ZarrLayer::open(FilesystemStore::new(&path).unwrap(), "/", "bare");
    assert!(matches!(result, Err(GridError::InvalidMetadata(_))));
}
