use std::path::Path;

use tracing::info;

use crate::{config::Config, resolver::Resolver, store::MapStore};

pub struct AppContext {
    pub store: MapStore,
    pub resolver: Resolver,
    pub config: Config,
}

impl AppContext {
    pub fn new(config: &Config) -> Self {
        let store = MapStore::new(Path::new(&config.maps_root));
        let resolver = Resolver::new(config, store.clone());

        info!(
            "AppContext initialized, serving maps from {}, map cache size {}",
            store.root().display(),
            config.map_cache_size
        );

        Self {
            store,
            resolver,
            config: config.clone(),
        }
    }
}
