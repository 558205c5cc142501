use moka::future::Cache;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::time::Duration;

use crate::config;

/// Short-lived response caches for the reference-data list endpoints, keyed
/// by the request's query string. Admin mutations invalidate the whole cache
/// for the affected resource; entries otherwise age out on the TTL.
fn build_cache() -> Cache<String, Value> {
    Cache::builder()
        .time_to_live(Duration::from_secs(
            config::config().api.reference_cache_ttl_secs,
        ))
        .max_capacity(256)
        .build()
}

pub static BRANDS_CACHE: Lazy<Cache<String, Value>> = Lazy::new(build_cache);
pub static CURRENCIES_CACHE: Lazy<Cache<String, Value>> = Lazy::new(build_cache);
pub static LOCATIONS_CACHE: Lazy<Cache<String, Value>> = Lazy::new(build_cache);
