use envconfig::Envconfig;

use crate::resolver::Markup;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "::")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3000")]
    pub port: u16,

    // Root directory of the map repository, uploads land here too
    #[envconfig(from = "MAPS_ROOT", default = "sourcemaps")]
    pub maps_root: String,

    #[envconfig(from = "MAX_BODY_SIZE", default = "104857600")] // 100MB, archives can be big
    pub max_body_size: usize,

    // Parsed maps held in memory across requests. 0 turns caching off entirely.
    #[envconfig(from = "MAP_CACHE_SIZE", default = "64")]
    pub map_cache_size: u64,

    #[envconfig(from = "MAP_CACHE_TTL_SECONDS", default = "600")]
    pub map_cache_ttl_seconds: u64,

    #[envconfig(from = "OUTPUT_MARKUP", default = "html")]
    pub output_markup: Markup,
}

impl Config {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.bind(), ":::3000");
        assert_eq!(config.maps_root, "sourcemaps");
        assert_eq!(config.map_cache_size, 64);
        assert_eq!(config.output_markup, Markup::Html);
    }

    #[test]
    fn overrides() {
        let env = HashMap::from([
            ("BIND_HOST".to_string(), "127.0.0.1".to_string()),
            ("BIND_PORT".to_string(), "8080".to_string()),
            ("OUTPUT_MARKUP".to_string(), "plain".to_string()),
            ("MAP_CACHE_SIZE".to_string(), "0".to_string()),
        ]);
        let config = Config::init_from_hashmap(&env).unwrap();
        assert_eq!(config.bind(), "127.0.0.1:8080");
        assert_eq!(config.output_markup, Markup::Plain);
        assert_eq!(config.map_cache_size, 0);
    }

    #[test]
    fn rejects_unknown_markup() {
        let env = HashMap::from([("OUTPUT_MARKUP".to_string(), "latex".to_string())]);
        assert!(Config::init_from_hashmap(&env).is_err());
    }
}
