//! Application state.
//!
//! Both registries and the configuration are built once at startup and shared
//! read-only behind an `Arc`; request handlers never mutate them.

use depot_core::Config;
use depot_processing::ProcessorRegistry;
use depot_storage::BackendRegistry;

#[derive(Clone)]
pub struct AppState {
    pub backends: BackendRegistry,
    pub processors: ProcessorRegistry,
    pub config: Config,
}

impl AppState {
    pub fn new(backends: BackendRegistry, processors: ProcessorRegistry, config: Config) -> Self {
        AppState {
            backends,
            processors,
            config,
        }
    }
}
