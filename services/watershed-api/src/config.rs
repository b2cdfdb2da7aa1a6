//! Service configuration assembled from environment variables.

use storage::ResultStoreConfig;
use terrain_grid::TerrainGridConfig;
use watershed::DelineationConfig;

/// Origins allowed when `CORS_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

/// Everything the HTTP service needs to build its state.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Terrain grid locations and chunk cache sizing.
    pub grids: TerrainGridConfig,

    /// Delineation defaults and limits.
    pub delineation: DelineationConfig,

    /// Result store backend.
    pub store: ResultStoreConfig,

    /// Allowed browser origins. A single `*` allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            grids: TerrainGridConfig::default(),
            delineation: DelineationConfig::default(),
            store: ResultStoreConfig::default(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CORS_ORIGINS")
            .ok()
            .map(|v| parse_origins(&v))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| Self::default().cors_origins);

        Self {
            grids: TerrainGridConfig::from_env(),
            delineation: DelineationConfig::from_env(),
            store: ResultStoreConfig::from_env(),
            cors_origins,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.grids.validate()?;
        self.delineation.validate()?;
        if self.delineation.cache_enabled {
            self.store.validate()?;
        }
        Ok(())
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
