//! Delineation request orchestration.
//!
//! Each request moves through
//!
//! ```text
//! Validating ─► Resolving ─► CacheCheck ─┬─► CacheHit ───────────────────────────────► Done
//!                                        └─► CacheMiss ─► Tracing ─► Polygonizing ─► Storing ─► Done
//! ```
//!
//! and ends in `Done` or fails with a [`DelineationError`]. Grid work runs
//! on the blocking pool.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;
use storage::ResultStore;
use terrain_grid::{CacheStats, GridProvider, GridSetStatus, GridStatus};
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cache::{CacheOutcome, ResultCache};
use crate::config::DelineationConfig;
use crate::error::{DelineationError, ErrorKind, Result};
use crate::polygon::WatershedPolygonBuilder;
use crate::resolver::PourPointResolver;
use crate::tracer::UpstreamTracer;
use crate::types::{CacheEntry, DelineationRequest, DelineationResponse, ResponseMetadata};

/// Request lifecycle stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Stage {
    Validating,
    Resolving,
    CacheCheck,
    CacheHit,
    CacheMiss,
    Tracing,
    Polygonizing,
    Storing,
    Done,
}

impl Stage {
    const ALL: [Stage; 9] = [
        Stage::Validating,
        Stage::Resolving,
        Stage::CacheCheck,
        Stage::CacheHit,
        Stage::CacheMiss,
        Stage::Tracing,
        Stage::Polygonizing,
        Stage::Storing,
        Stage::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::Resolving => "resolving",
            Stage::CacheCheck => "cache_check",
            Stage::CacheHit => "cache_hit",
            Stage::CacheMiss => "cache_miss",
            Stage::Tracing => "tracing",
            Stage::Polygonizing => "polygonizing",
            Stage::Storing => "storing",
            Stage::Done => "done",
        }
    }

    fn from_u8(value: u8) -> Stage {
        Stage::ALL
            .get(value as usize)
            .copied()
            .unwrap_or(Stage::CacheCheck)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn transition(request_id: Uuid, stage: Stage) {
    debug!(request_id = %request_id, stage = %stage, "Delineation stage");
}

/// Read-only readiness report.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub ready: bool,
    pub grids: Vec<GridStatus>,
    pub cache_enabled: bool,
    pub cache_backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_cache: Option<CacheStats>,
}

/// Runs delineation requests against one grid set and result cache.
pub struct DelineationService {
    grids: Arc<dyn GridProvider>,
    cache: ResultCache,
    config: DelineationConfig,
    resolver: PourPointResolver,
    tracer: UpstreamTracer,
    builder: WatershedPolygonBuilder,
}

impl DelineationService {
    /// Create a service. Results are cached in `store` unless caching is
    /// disabled in `config` or no store is given.
    pub fn new(
        grids: Arc<dyn GridProvider>,
        store: Option<Arc<dyn ResultStore>>,
        config: DelineationConfig,
    ) -> Self {
        let cache = match store {
            Some(store) if config.cache_enabled => {
                ResultCache::new(store, config.cache_key_precision)
            }
            _ => ResultCache::disabled(config.cache_key_precision),
        };

        Self {
            grids,
            cache,
            resolver: PourPointResolver::new(config.max_snap_radius as f64),
            tracer: UpstreamTracer::new(config.d8_encoding, config.max_watershed_cells),
            builder: WatershedPolygonBuilder::new(),
            config,
        }
    }

    /// Edge length of the tiles read while tracing and sampling elevation.
    pub fn with_trace_tile_size(mut self, tile_size: usize) -> Self {
        self.tracer = self.tracer.with_tile_size(tile_size);
        self.builder = self.builder.with_tile_size(tile_size);
        self
    }

    pub fn config(&self) -> &DelineationConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Delineate the watershed draining to a clicked point.
    pub async fn delineate(&self, request: DelineationRequest) -> Result<DelineationResponse> {
        let request_id = Uuid::new_v4();
        counter!("watershed_requests_total").increment(1);

        let span = info_span!("delineate", request_id = %request_id);
        match self.run(request_id, request).instrument(span).await {
            Ok(response) => Ok(response),
            Err((stage, err)) => {
                let kind = err.kind();
                counter!("watershed_failures_total", "kind" => kind.as_str()).increment(1);
                match kind {
                    ErrorKind::EmptyResult | ErrorKind::Internal => error!(
                        request_id = %request_id,
                        stage = %stage,
                        kind = %kind,
                        error = %err,
                        "Delineation failed"
                    ),
                    _ => warn!(
                        request_id = %request_id,
                        stage = %stage,
                        kind = %kind,
                        error = %err,
                        "Delineation failed"
                    ),
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        request_id: Uuid,
        request: DelineationRequest,
    ) -> std::result::Result<DelineationResponse, (Stage, DelineationError)> {
        let started = Instant::now();

        transition(request_id, Stage::Validating);
        let (snap, radius) = self
            .validate(&request)
            .map_err(|e| (Stage::Validating, e))?;
        let snapping = snap && radius > 0;

        transition(request_id, Stage::Resolving);
        let grids = self.grids.clone();
        let resolver = self.resolver;
        let (lat, lon) = (request.lat, request.lon);
        let (grid, pour_point) = tokio::task::spawn_blocking(move || {
            let grid = grids.grids()?;
            let pour_point = resolver.resolve(grid.as_ref(), lon, lat, snapping, radius as f64)?;
            Ok::<_, DelineationError>((grid, pour_point))
        })
        .await
        .map_err(DelineationError::from)
        .and_then(|r| r)
        .map_err(|e| (Stage::Resolving, e))?;

        let key = self
            .cache
            .key(pour_point.lat, pour_point.lon, snapping, radius);
        transition(request_id, Stage::CacheCheck);

        let stage = Arc::new(AtomicU8::new(Stage::CacheCheck as u8));
        let compute = {
            let stage = stage.clone();
            let tracer = self.tracer;
            let builder = self.builder;
            let pour_point = pour_point.clone();
            let key = key.clone();

            move || async move {
                let computing = Instant::now();
                stage.store(Stage::CacheMiss as u8, Ordering::Relaxed);
                transition(request_id, Stage::CacheMiss);

                let target = pour_point.pixel;
                let blocking_stage = stage.clone();
                let watershed = tokio::task::spawn_blocking(move || {
                    blocking_stage.store(Stage::Tracing as u8, Ordering::Relaxed);
                    transition(request_id, Stage::Tracing);
                    let mask = tracer.trace(grid.as_ref(), target)?;

                    blocking_stage.store(Stage::Polygonizing as u8, Ordering::Relaxed);
                    transition(request_id, Stage::Polygonizing);
                    builder.build(&mask, grid.as_ref())
                })
                .await??;

                let computation_seconds = computing.elapsed().as_secs_f64();
                histogram!("watershed_compute_seconds").record(computation_seconds);

                stage.store(Stage::Storing as u8, Ordering::Relaxed);
                transition(request_id, Stage::Storing);
                Ok::<_, DelineationError>(CacheEntry {
                    key,
                    watershed,
                    pour_point,
                    computation_seconds,
                    created_at: Utc::now(),
                })
            }
        };

        let (entry, outcome) = self
            .cache
            .get_or_compute(&key, compute)
            .await
            .map_err(|e| (Stage::from_u8(stage.load(Ordering::Relaxed)), e))?;

        let from_cache = outcome == CacheOutcome::Hit;
        if from_cache {
            counter!("watershed_cache_hits_total").increment(1);
            transition(request_id, Stage::CacheHit);
        } else {
            counter!("watershed_cache_misses_total").increment(1);
        }

        transition(request_id, Stage::Done);
        debug!(
            request_id = %request_id,
            key = %key,
            outcome = ?outcome,
            cells = entry.watershed.stats.num_cells,
            "Delineation complete"
        );

        Ok(DelineationResponse::new(
            &entry.watershed,
            &pour_point,
            ResponseMetadata {
                processing_time_seconds: started.elapsed().as_secs_f64(),
                from_cache,
                snap_radius: snapping.then_some(radius),
                cache_key: key,
            },
        ))
    }

    /// Check request bounds and apply configured defaults.
    /// Returns `(snap_to_stream, snap_radius)`.
    fn validate(&self, request: &DelineationRequest) -> Result<(bool, i64)> {
        if !request.lat.is_finite() || !(-90.0..=90.0).contains(&request.lat) {
            return Err(DelineationError::invalid_parameter(format!(
                "lat must be within [-90, 90], got {}",
                request.lat
            )));
        }
        if !request.lon.is_finite() || !(-180.0..=180.0).contains(&request.lon) {
            return Err(DelineationError::invalid_parameter(format!(
                "lon must be within [-180, 180], got {}",
                request.lon
            )));
        }

        let snap = request
            .snap_to_stream
            .unwrap_or(self.config.snap_to_stream);
        let radius = request
            .snap_radius
            .unwrap_or(self.config.default_snap_radius);
        if radius < 0 || radius > self.config.max_snap_radius {
            return Err(DelineationError::invalid_parameter(format!(
                "snap_radius must be within [0, {}] meters, got {}",
                self.config.max_snap_radius, radius
            )));
        }

        Ok((snap, radius))
    }

    /// Report grid availability and cache configuration. Computes nothing.
    pub async fn status(&self) -> ServiceStatus {
        let grids = self.grids.clone();
        let (grid_status, chunk_cache) =
            tokio::task::spawn_blocking(move || (grids.status(), grids.cache_stats()))
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Status probe failed");
                    (
                        GridSetStatus {
                            grids: Vec::new(),
                            ready: false,
                        },
                        None,
                    )
                });

        ServiceStatus {
            ready: grid_status.ready,
            grids: grid_status.grids,
            cache_enabled: self.cache.is_enabled(),
            cache_backend: self.cache.backend_name(),
            chunk_cache,
        }
    }

    /// Delete every stored result. Returns the number removed.
    pub async fn clear_cache(&self) -> Result<u64> {
        self.cache.clear().await
    }

    /// Delete the stored result for one cache key.
    pub async fn invalidate(&self, key: &str) -> Result<bool> {
        self.cache.invalidate(key).await
    }
}
