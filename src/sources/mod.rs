//! External catalog adapters.
//!
//! Each source knows how to fetch and parse one catalog:
//! - Kitapyurdu, BKM Kitap and idefix are scraped retail sites, each a
//!   [`ScrapedSite`] layout driven by the shared [`ScrapedSource`]
//! - Google Books and Open Library are structured APIs
//!   (`GoogleBooksSource`, `OpenLibrarySource`)
//!
//! All of them map their responses into [`BookMetadata`].

mod bkmkitap;
mod google_books;
mod idefix;
mod kitapyurdu;
mod open_library;
mod scrape;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BookMetadata, Config, SourceId};
use crate::utils::html::{AllowListSanitizer, Sanitizer};
use crate::utils::http::Fetcher;
use crate::utils::text::normalize_identifier;

pub use bkmkitap::{BkmKitap, BkmKitapSource};
pub use google_books::GoogleBooksSource;
pub use idefix::{Idefix, IdefixSource};
pub use kitapyurdu::{Kitapyurdu, KitapyurduSource};
pub use open_library::OpenLibrarySource;
pub use scrape::{ScrapedSite, ScrapedSource};

/// Contract every catalog adapter implements.
///
/// Identifier lookup is mandatory; address lookup and free-text search are
/// capabilities advertised through `supports_*`. Failures are reported as
/// errors; the aggregator turns them into "no result".
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    /// Find the edition with this (normalized) identifier.
    async fn lookup_by_identifier(&self, identifier: &str) -> Result<Option<BookMetadata>>;

    fn supports_address(&self) -> bool {
        false
    }

    /// Parse a detail page directly, skipping the site search.
    async fn lookup_by_address(&self, _address: &str) -> Result<Option<BookMetadata>> {
        Ok(None)
    }

    fn supports_search(&self) -> bool {
        false
    }

    /// Free-text search returning partial records.
    async fn search_by_text(&self, _query: &str) -> Result<Vec<BookMetadata>> {
        Ok(Vec::new())
    }
}

/// Collaborators shared by all adapters.
#[derive(Clone)]
pub struct SourceContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub sanitizer: Arc<dyn Sanitizer>,
    pub max_results: usize,
}

impl SourceContext {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            sanitizer: Arc::new(AllowListSanitizer),
            max_results: 10,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Build a context from configuration around an existing fetcher.
    pub fn from_config(config: &Config, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::new(fetcher).with_max_results(config.search.max_results_per_source)
    }
}

/// Instantiate the adapter for `source`.
pub fn adapter_for(source: SourceId, ctx: &SourceContext) -> Arc<dyn SourceAdapter> {
    match source {
        SourceId::Kitapyurdu => Arc::new(KitapyurduSource::new(ctx.clone())),
        SourceId::BkmKitap => Arc::new(BkmKitapSource::new(ctx.clone())),
        SourceId::Idefix => Arc::new(IdefixSource::new(ctx.clone())),
        SourceId::GoogleBooks => Arc::new(GoogleBooksSource::new(ctx.clone())),
        SourceId::OpenLibrary => Arc::new(OpenLibrarySource::new(ctx.clone())),
    }
}

/// All five adapters, in [`SourceId::ALL`] order.
pub fn default_adapters(ctx: &SourceContext) -> Vec<Arc<dyn SourceAdapter>> {
    SourceId::ALL
        .into_iter()
        .map(|source| adapter_for(source, ctx))
        .collect()
}

/// Pick the ISBN-13 from a set of identifiers, falling back to ISBN-10.
pub(crate) fn prefer_isbn13<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut ten = None;
    for candidate in candidates {
        let id = normalize_identifier(candidate);
        match id.len() {
            13 => return Some(id),
            10 if ten.is_none() => ten = Some(id),
            _ => {}
        }
    }
    ten
}

/// Recorded upstream responses for adapter tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::{AppError, Result};
    use crate::utils::http::Fetcher;

    /// Read a file from `fixtures/`.
    pub(crate) fn fixture(name: &str) -> String {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/");
        std::fs::read_to_string(format!("{path}{name}")).unwrap()
    }

    /// Serves recorded bodies keyed by address and records every request.
    #[derive(Default)]
    pub(crate) struct FixtureFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl FixtureFetcher {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Serve `fixtures/<name>` at `url`.
        pub(crate) fn page(mut self, url: &str, name: &str) -> Self {
            self.pages.insert(url.to_string(), fixture(name));
            self
        }

        /// Serve an inline body at `url`.
        pub(crate) fn body(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for FixtureFetcher {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| {
                AppError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no fixture for {url}"),
                ))
            })
        }
    }
}
