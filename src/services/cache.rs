// src/services/cache.rs

//! Time-bounded result cache.
//!
//! Entries are keyed by `(source, identifier)` and hold the outcome of one
//! adapter invocation, including "not found". Expiry is lazy: a stale
//! entry is dropped the next time it is read.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::models::{BookMetadata, SourceId};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Nothing stored, or the stored entry expired.
    Miss,
    /// A stored outcome; `Hit(None)` is a remembered "not found".
    Hit(Option<BookMetadata>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<BookMetadata>,
    written_at: DateTime<Utc>,
}

type CacheKey = (SourceId, String);

/// Concurrent map of lookup outcomes with a fixed time-to-live.
pub struct ResultCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.written_at > self.ttl
    }

    /// Read the stored outcome for `(source, identifier)`.
    pub fn get(&self, source: SourceId, identifier: &str) -> CacheLookup {
        let key = (source, identifier.to_string());
        let now = self.clock.now();

        // The read guard must be released before removing the key.
        let cached = match self.entries.get(&key) {
            Some(entry) if !self.is_expired(&entry, now) => Some(entry.value.clone()),
            Some(_) => None,
            None => return CacheLookup::Miss,
        };

        match cached {
            Some(value) => CacheLookup::Hit(value),
            None => {
                self.entries
                    .remove_if(&key, |_, entry| self.is_expired(entry, now));
                log::debug!("cache: expired {}:{}", source, identifier);
                CacheLookup::Miss
            }
        }
    }

    /// Store an outcome. Records without a title are stored as "not found".
    pub fn put(&self, source: SourceId, identifier: &str, value: Option<BookMetadata>) {
        let entry = CacheEntry {
            value: value.and_then(BookMetadata::into_found),
            written_at: self.clock.now(),
        };
        self.entries.insert((source, identifier.to_string()), entry);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            log::debug!("cache: swept {} expired entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(Duration::seconds(Self::DEFAULT_TTL_SECS))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Clock that only moves when told to.
    pub(crate) struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
            }
        }

        pub(crate) fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn cache_with_clock() -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResultCache::with_clock(Duration::hours(24), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_miss_then_hit() {
        let (cache, _) = cache_with_clock();
        assert_eq!(cache.get(SourceId::Kitapyurdu, "9789750718533"), CacheLookup::Miss);

        let book = BookMetadata::new("Kürk Mantolu Madonna", "Sabahattin Ali");
        cache.put(SourceId::Kitapyurdu, "9789750718533", Some(book.clone()));

        assert_eq!(
            cache.get(SourceId::Kitapyurdu, "9789750718533"),
            CacheLookup::Hit(Some(book))
        );
        assert_eq!(cache.get(SourceId::Idefix, "9789750718533"), CacheLookup::Miss);
    }

    #[test]
    fn test_not_found_is_a_hit() {
        let (cache, _) = cache_with_clock();
        cache.put(SourceId::GoogleBooks, "0000000000", None);
        assert_eq!(cache.get(SourceId::GoogleBooks, "0000000000"), CacheLookup::Hit(None));
    }

    #[test]
    fn test_untitled_record_stored_as_not_found() {
        let (cache, _) = cache_with_clock();
        cache.put(SourceId::OpenLibrary, "123", Some(BookMetadata::new("  ", "x")));
        assert_eq!(cache.get(SourceId::OpenLibrary, "123"), CacheLookup::Hit(None));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.put(SourceId::BkmKitap, "1", Some(BookMetadata::new("A", "B")));

        clock.advance(Duration::hours(24));
        assert!(matches!(cache.get(SourceId::BkmKitap, "1"), CacheLookup::Hit(Some(_))));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get(SourceId::BkmKitap, "1"), CacheLookup::Miss);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_refreshes_timestamp() {
        let (cache, clock) = cache_with_clock();
        cache.put(SourceId::Idefix, "1", None);
        clock.advance(Duration::hours(20));
        cache.put(SourceId::Idefix, "1", Some(BookMetadata::new("A", "B")));
        clock.advance(Duration::hours(20));
        assert!(matches!(cache.get(SourceId::Idefix, "1"), CacheLookup::Hit(Some(_))));
    }

    #[test]
    fn test_sweep_expired() {
        let (cache, clock) = cache_with_clock();
        cache.put(SourceId::Kitapyurdu, "old", None);
        clock.advance(Duration::hours(25));
        cache.put(SourceId::Kitapyurdu, "new", None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(SourceId::Kitapyurdu, "new"), CacheLookup::Hit(None));

        cache.clear();
        assert!(cache.is_empty());
    }
}
