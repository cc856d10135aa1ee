pub const FRAMES_RESOLVED: &str = "unminify_frames_resolved";
pub const FRAMES_UNRESOLVED: &str = "unminify_frames_unresolved";
pub const FRAMES_UNMATCHED: &str = "unminify_frames_unmatched";
pub const TRACES_RESOLVED: &str = "unminify_traces_resolved";
pub const MAP_PARSE_ERRORS: &str = "unminify_map_parse_errors";
pub const MAP_PARSE_TIME: &str = "unminify_map_parse_seconds";
pub const MAP_CACHE_HITS: &str = "unminify_map_cache_hits";
pub const MAP_CACHE_MISSES: &str = "unminify_map_cache_misses";
pub const MAPS_LISTED: &str = "unminify_maps_listed";
pub const MAP_UPLOADS: &str = "unminify_map_uploads";
pub const ARCHIVE_UPLOADS: &str = "unminify_archive_uploads";
pub const ARCHIVE_ENTRIES_EXTRACTED: &str = "unminify_archive_entries_extracted";
pub const STORE_SCAN_ERRORS: &str = "unminify_store_scan_errors";
