//! Service layer for the lookup library.
//!
//! - Result caching (`ResultCache`)
//! - Source routing, fallback and search merging (`LookupAggregator`)

mod aggregator;
mod cache;

pub use aggregator::LookupAggregator;
pub use cache::{CacheLookup, Clock, ResultCache, SystemClock};
