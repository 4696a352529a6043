// src/services/aggregator.rs

//! Lookup aggregator.
//!
//! Routes lookups to the registered catalog adapters, applies the
//! identifier-dependent source priority, merges federated search results
//! and keeps every adapter outcome in the [`ResultCache`]. Adapter failures
//! stop here: they are logged and reported as "no result".

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{BookMetadata, Config, SourceId};
use crate::services::cache::{CacheLookup, ResultCache};
use crate::sources::{SourceAdapter, SourceContext, default_adapters};
use crate::utils::http::ReqwestFetcher;
use crate::utils::text::normalize_identifier;

type InFlightKey = (SourceId, String);
type InFlightTable = DashMap<InFlightKey, Arc<Mutex<()>>>;

/// A caller's share of the per-key lock for one cache miss.
///
/// The last participant to leave removes the table entry, whether its
/// lookup finished or was dropped mid-fetch.
struct InFlightSlot<'a> {
    table: &'a InFlightTable,
    key: InFlightKey,
    lock: Arc<Mutex<()>>,
}

impl<'a> InFlightSlot<'a> {
    fn join(table: &'a InFlightTable, key: InFlightKey) -> Self {
        let lock = table.entry(key.clone()).or_default().clone();
        Self { table, key, lock }
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        // One reference is held by the table, one by this slot.
        self.table.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) <= 2
        });
    }
}

/// Entry point for metadata lookups across all catalogs.
pub struct LookupAggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    cache: Arc<ResultCache>,
    dedupe_in_flight: bool,
    in_flight: InFlightTable,
}

impl LookupAggregator {
    /// Create an aggregator with no adapters registered.
    pub fn new(cache: Arc<ResultCache>) -> Self {
        Self {
            adapters: Vec::new(),
            cache,
            dedupe_in_flight: true,
            in_flight: DashMap::new(),
        }
    }

    /// Build an aggregator with all five catalogs over a shared HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(ReqwestFetcher::from_config(&config.http)?);
        let ctx = SourceContext::from_config(config, fetcher);
        let cache = Arc::new(ResultCache::new(config.cache_ttl()));

        let mut aggregator = Self::new(cache).with_dedupe(config.cache.dedupe_in_flight);
        for adapter in default_adapters(&ctx) {
            aggregator.register(adapter);
        }
        log::debug!(
            "aggregator: registered {} sources, ttl {}s",
            aggregator.adapters.len(),
            config.cache.ttl_secs
        );
        Ok(aggregator)
    }

    /// Toggle collapsing of concurrent identical cache misses.
    pub fn with_dedupe(mut self, enabled: bool) -> Self {
        self.dedupe_in_flight = enabled;
        self
    }

    /// Add an adapter. Re-registering a source replaces the previous adapter
    /// in its original position.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        let id = adapter.id();
        match self.adapters.iter().position(|a| a.id() == id) {
            Some(index) => self.adapters[index] = adapter,
            None => self.adapters.push(adapter),
        }
    }

    /// Registered sources in registration order.
    pub fn sources(&self) -> Vec<SourceId> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    fn adapter(&self, source: SourceId) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.iter().find(|a| a.id() == source)
    }

    /// Look `identifier` up in a single source, through the cache.
    ///
    /// Fails only when `source` has no registered adapter.
    pub async fn lookup(&self, identifier: &str, source: SourceId) -> Result<Option<BookMetadata>> {
        let adapter = self
            .adapter(source)
            .ok_or_else(|| AppError::unknown_source(source.as_str()))?;

        let id = normalize_identifier(identifier);
        if id.is_empty() {
            return Ok(None);
        }

        if let CacheLookup::Hit(cached) = self.cache.get(source, &id) {
            log::debug!("cache hit {}:{}", source, id);
            return Ok(cached);
        }

        if !self.dedupe_in_flight {
            return Ok(self.fetch_and_store(adapter.as_ref(), &id).await);
        }

        let slot = InFlightSlot::join(&self.in_flight, (source, id.clone()));
        let _guard = slot.lock.lock().await;

        // Another caller may have filled the entry while we waited.
        if let CacheLookup::Hit(cached) = self.cache.get(source, &id) {
            return Ok(cached);
        }

        Ok(self.fetch_and_store(adapter.as_ref(), &id).await)
    }

    /// Like [`lookup`](Self::lookup) with the source given by name.
    pub async fn lookup_by_name(
        &self,
        identifier: &str,
        source: &str,
    ) -> Result<Option<BookMetadata>> {
        let source: SourceId = source.parse()?;
        self.lookup(identifier, source).await
    }

    async fn fetch_and_store(&self, adapter: &dyn SourceAdapter, id: &str) -> Option<BookMetadata> {
        let source = adapter.id();
        let found = match adapter.lookup_by_identifier(id).await {
            Ok(found) => found.and_then(BookMetadata::into_found),
            Err(e) => {
                log::warn!("{} lookup failed for {}: {}", source, id, e);
                None
            }
        };
        self.cache.put(source, id, found.clone());
        found
    }

    /// Try every source in priority order and return the first match.
    ///
    /// Sources are called one at a time; once one yields a record no
    /// further source is asked.
    pub async fn lookup_all_sources(&self, identifier: &str) -> Option<(SourceId, BookMetadata)> {
        let id = normalize_identifier(identifier);
        if id.is_empty() {
            return None;
        }

        for &source in SourceId::priority_for(&id) {
            if self.adapter(source).is_none() {
                continue;
            }
            match self.lookup(&id, source).await {
                Ok(Some(book)) => {
                    log::info!("{} found via {}", id, source);
                    return Some((source, book));
                }
                Ok(None) => log::debug!("{} not in {}", id, source),
                Err(e) => log::warn!("{} lookup via {} failed: {}", id, source, e),
            }
        }

        log::info!("{} not found in any source", id);
        None
    }

    /// Free-text search over one source, or all search-capable sources.
    ///
    /// Federated results keep the first record for each title and author
    /// pair, so earlier sources win.
    pub async fn search_by_text(&self, query: &str, source: Option<SourceId>) -> Vec<BookMetadata> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let targets: Vec<&Arc<dyn SourceAdapter>> = match source {
            Some(source) => self.adapter(source).into_iter().collect(),
            None => self
                .adapters
                .iter()
                .filter(|a| a.supports_search())
                .collect(),
        };

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for adapter in targets {
            let results = match adapter.search_by_text(query).await {
                Ok(results) => results,
                Err(e) => {
                    log::warn!("{} search failed for {:?}: {}", adapter.id(), query, e);
                    continue;
                }
            };
            log::debug!("{} returned {} results", adapter.id(), results.len());

            for book in results.into_iter().filter_map(BookMetadata::into_found) {
                if seen.insert(book.dedup_key()) {
                    merged.push(book);
                }
            }
        }
        merged
    }

    /// Parse a product page directly, routing by the address's domain.
    pub async fn lookup_by_address(&self, address: &str) -> Option<BookMetadata> {
        let Some(source) = SourceId::from_address(address) else {
            log::debug!("no source handles {}", address);
            return None;
        };
        let adapter = self.adapter(source).filter(|a| a.supports_address())?;

        match adapter.lookup_by_address(address).await {
            Ok(found) => found.and_then(BookMetadata::into_found),
            Err(e) => {
                log::warn!("{} address lookup failed for {}: {}", source, address, e);
                None
            }
        }
    }

    /// Fetch fuller detail for a partial record, typically a search hit.
    pub async fn complete(&self, partial: &BookMetadata) -> Option<BookMetadata> {
        if let Some(address) = partial.source_url.as_deref() {
            if let Some(book) = self.lookup_by_address(address).await {
                return Some(book);
            }
        }
        if partial.identifier.is_empty() {
            return None;
        }
        self.lookup_all_sources(&partial.identifier)
            .await
            .map(|(_, book)| book)
    }
}
