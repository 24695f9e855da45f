/// Read-through caching around an async computation.
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues the
/// result for a background write with the given TTL (seconds) and returns it.
/// Errors from `$block` propagate with `?` and are never cached.
///
/// # Example
/// ```rust,ignore
/// let movie: Option<MovieSummary> = cached!(
///     self.cache,
///     CacheKey::TitleSearch(query.to_string()),
///     SEARCH_CACHE_TTL,
///     async move { self.fetch_first_match(query).await }
/// );
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await {
            cached
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            value
        }
    }};
}
