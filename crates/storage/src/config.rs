//! Result store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which backend holds stored results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local LRU map; lost on restart.
    Memory,
    /// One JSON object per key under a local directory.
    Filesystem,
    /// One JSON object per key in an S3-compatible bucket.
    S3,
    /// Redis strings with optional expiry.
    Redis,
}

impl CacheBackend {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "filesystem" | "file" | "fs" => Some(Self::Filesystem),
            "s3" | "minio" => Some(Self::S3),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Filesystem => "filesystem",
            Self::S3 => "s3",
            Self::Redis => "redis",
        }
    }
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for an S3/MinIO bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "watershed-cache".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

impl ObjectStorageConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("S3_ENDPOINT") {
            config.endpoint = val;
        }
        if let Ok(val) = std::env::var("S3_BUCKET") {
            config.bucket = val;
        }
        if let Ok(val) = std::env::var("S3_ACCESS_KEY") {
            config.access_key_id = val;
        }
        if let Ok(val) = std::env::var("S3_SECRET_KEY") {
            config.secret_access_key = val;
        }
        if let Ok(val) = std::env::var("S3_REGION") {
            config.region = val;
        }
        if let Ok(val) = std::env::var("S3_ALLOW_HTTP") {
            config.allow_http = val.to_lowercase() == "true" || val == "1";
        }

        config
    }
}

/// Configuration for the delineation result store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultStoreConfig {
    /// Backend holding stored results.
    pub backend: CacheBackend,

    /// Root directory for the filesystem backend.
    pub cache_dir: PathBuf,

    /// Entry capacity of the memory backend.
    pub memory_entries: usize,

    /// Redis connection URL.
    pub redis_url: String,

    /// Expiry for Redis entries; `None` keeps them until cleared.
    pub ttl_secs: Option<u64>,

    /// Bucket settings for the S3 backend.
    pub s3: ObjectStorageConfig,
}

impl Default for ResultStoreConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Filesystem,
            cache_dir: PathBuf::from("./data/cache"),
            memory_entries: 1024,
            redis_url: "redis://localhost:6379/0".to_string(),
            ttl_secs: None,
            s3: ObjectStorageConfig::default(),
        }
    }
}

impl ResultStoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CACHE_BACKEND") {
            if let Some(backend) = CacheBackend::from_str(&val) {
                config.backend = backend;
            }
        }

        if let Ok(val) = std::env::var("CACHE_DIR") {
            config.cache_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CACHE_MEMORY_ENTRIES") {
            if let Ok(n) = val.parse() {
                config.memory_entries = n;
            }
        }

        if let Ok(val) = std::env::var("REDIS_URL") {
            config.redis_url = val;
        }

        if let Ok(val) = std::env::var("CACHE_TTL_SECS") {
            config.ttl_secs = val.parse().ok().filter(|&secs: &u64| secs > 0);
        }

        config.s3 = ObjectStorageConfig::from_env();
        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        match self.backend {
            CacheBackend::Memory if self.memory_entries == 0 => {
                Err("memory_entries must be > 0".to_string())
            }
            CacheBackend::Filesystem if self.cache_dir.as_os_str().is_empty() => {
                Err("cache_dir must not be empty".to_string())
            }
            CacheBackend::Redis if !self.redis_url.starts_with("redis") => {
                Err(format!("invalid redis url: {}", self.redis_url))
            }
            CacheBackend::S3 if self.s3.bucket.is_empty() => {
                Err("s3 bucket must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}
