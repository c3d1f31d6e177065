//! Metrics for cache effectiveness.

use metrics::{counter, describe_counter};

/// Metric names for the cache layer.
pub mod names {
    /// Total cache lookups answered from the store.
    pub const CACHE_HITS_TOTAL: &str = "echoes_cache_hits_total";
    /// Total cache lookups that fell through to the database.
    pub const CACHE_MISSES_TOTAL: &str = "echoes_cache_misses_total";
    /// Total store failures absorbed by the cache layer.
    pub const CACHE_ERRORS_TOTAL: &str = "echoes_cache_errors_total";
    /// Total pagination version rotations.
    pub const VERSION_ROTATIONS_TOTAL: &str = "echoes_cache_version_rotations_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(
        names::CACHE_ERRORS_TOTAL,
        "Total number of key-value store failures absorbed by the cache layer"
    );
    describe_counter!(
        names::VERSION_ROTATIONS_TOTAL,
        "Total number of pagination version rotations"
    );
}

/// Cache metrics recorder.
#[derive(Clone, Copy)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn hit(cache: &'static str) {
        counter!(names::CACHE_HITS_TOTAL, "cache" => cache).increment(1);
    }

    pub fn miss(cache: &'static str) {
        counter!(names::CACHE_MISSES_TOTAL, "cache" => cache).increment(1);
    }

    pub fn error(cache: &'static str, class: &'static str) {
        counter!(names::CACHE_ERRORS_TOTAL, "cache" => cache, "class" => class).increment(1);
    }

    pub fn rotation(scope: &'static str) {
        counter!(names::VERSION_ROTATIONS_TOTAL, "scope" => scope).increment(1);
    }
}
