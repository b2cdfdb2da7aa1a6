//! Application state for the watershed API.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;

use terrain_grid::ZarrGridProvider;
use watershed::DelineationService;

use crate::config::ApiConfig;

/// Shared application state.
pub struct AppState {
    /// Delineation engine with its result cache.
    pub service: DelineationService,

    /// Prometheus recorder handle, when one is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// Grids are opened lazily on first use, so a missing grid set does not
    /// stop the server from starting; the status endpoint reports it instead.
    pub async fn new(config: &ApiConfig, prometheus: Option<PrometheusHandle>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

        let store = if config.delineation.cache_enabled {
            let store = storage::build_store(&config.store)
                .await
                .with_context(|| format!("Failed to open {} result store", config.store.backend.as_str()))?;
            Some(store)
        } else {
            info!("Result cache disabled");
            None
        };

        let grids = Arc::new(ZarrGridProvider::new(config.grids.clone()));
        let service = DelineationService::new(grids, store, config.delineation.clone())
            .with_trace_tile_size(config.grids.trace_tile_size);

        info!(
            dem = %config.grids.dem_path.display(),
            flow_dir = %config.grids.flow_dir_path.display(),
            flow_acc = %config.grids.flow_acc_path.display(),
            encoding = %config.delineation.d8_encoding,
            "Delineation service configured"
        );

        Ok(Self {
            service,
            prometheus,
        })
    }

    /// Wrap an already built service.
    pub fn from_service(service: DelineationService) -> Self {
        Self {
            service,
            prometheus: None,
        }
    }
}
