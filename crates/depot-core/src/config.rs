//! Configuration module
//!
//! One configuration struct, built once at startup and shared by reference.
//! Nothing here mutates after the server starts serving; test code constructs
//! the struct directly instead of going through the environment.

use std::env;
use std::path::PathBuf;

const DEFAULT_READ_CHUNK_SIZE: usize = 50_000;
const DEFAULT_PORT: u16 = 3000;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Chunk size in bytes used when streaming file content.
    pub read_chunk_size: usize,
    /// Request-signing secret. `None` disables signature verification.
    pub secret: Option<String>,
    /// Value for `Access-Control-Allow-Origin` on successful retrievals.
    pub allow_origin: Option<String>,
    pub host: String,
    pub port: u16,
    /// Root directory of the volatile cache tier.
    pub cache_root: PathBuf,
    /// Root directory of the durable store tier.
    pub store_root: PathBuf,
    /// Advisory upload size cap for the cache tier, in bytes.
    pub max_cache_size: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            secret: None,
            allow_origin: None,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cache_root: PathBuf::from("data/cache"),
            store_root: PathBuf::from("data/store"),
            max_cache_size: None,
        }
    }
}

impl Config {
    /// Load configuration from `DEPOT_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let defaults = Config::default();

        let read_chunk_size = match env::var("DEPOT_READ_CHUNK_SIZE") {
            Ok(raw) => {
                let parsed: usize = raw
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid DEPOT_READ_CHUNK_SIZE '{raw}': {e}"))?;
                if parsed == 0 {
                    anyhow::bail!("DEPOT_READ_CHUNK_SIZE must be greater than zero");
                }
                parsed
            }
            Err(_) => defaults.read_chunk_size,
        };

        let port = match env::var("DEPOT_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid DEPOT_PORT '{raw}': {e}"))?,
            Err(_) => defaults.port,
        };

        let max_cache_size = match env::var("DEPOT_MAX_CACHE_SIZE") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|e| anyhow::anyhow!("invalid DEPOT_MAX_CACHE_SIZE '{raw}': {e}"))?,
            ),
            Err(_) => None,
        };

        Ok(Config {
            read_chunk_size,
            secret: env::var("DEPOT_SECRET").ok().filter(|s| !s.is_empty()),
            allow_origin: env::var("DEPOT_ALLOW_ORIGIN").ok().filter(|s| !s.is_empty()),
            host: env::var("DEPOT_HOST").unwrap_or(defaults.host),
            port,
            cache_root: env::var("DEPOT_CACHE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_root),
            store_root: env::var("DEPOT_STORE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_root),
            max_cache_size,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
