//! Identity of the external catalogs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One of the five external catalogs.
///
/// Adding a catalog means adding a variant here, an adapter under
/// `sources/`, and a place in [`SourceId::priority_for`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Kitapyurdu,
    #[serde(rename = "bkmkitap")]
    BkmKitap,
    Idefix,
    GoogleBooks,
    OpenLibrary,
}

/// Identifier prefixes assigned to the Turkish market.
const REGIONAL_PREFIXES: [&str; 2] = ["975", "978975"];

impl SourceId {
    /// All sources, in federated search order.
    pub const ALL: [SourceId; 5] = [
        SourceId::Kitapyurdu,
        SourceId::BkmKitap,
        SourceId::Idefix,
        SourceId::GoogleBooks,
        SourceId::OpenLibrary,
    ];

    const REGIONAL_FIRST: [SourceId; 5] = Self::ALL;

    const INTERNATIONAL_FIRST: [SourceId; 5] = [
        SourceId::GoogleBooks,
        SourceId::OpenLibrary,
        SourceId::Kitapyurdu,
        SourceId::BkmKitap,
        SourceId::Idefix,
    ];

    /// Stable machine-readable id.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Kitapyurdu => "kitapyurdu",
            SourceId::BkmKitap => "bkmkitap",
            SourceId::Idefix => "idefix",
            SourceId::GoogleBooks => "google_books",
            SourceId::OpenLibrary => "open_library",
        }
    }

    /// Human-readable name for source pickers.
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::Kitapyurdu => "Kitapyurdu",
            SourceId::BkmKitap => "BKM Kitap",
            SourceId::Idefix => "idefix",
            SourceId::GoogleBooks => "Google Books",
            SourceId::OpenLibrary => "Open Library",
        }
    }

    /// Scraped Turkish retail site rather than an international API.
    pub fn is_regional(&self) -> bool {
        matches!(
            self,
            SourceId::Kitapyurdu | SourceId::BkmKitap | SourceId::Idefix
        )
    }

    /// Domain substring that identifies this source's pages.
    pub fn domain(&self) -> Option<&'static str> {
        match self {
            SourceId::Kitapyurdu => Some("kitapyurdu.com"),
            SourceId::BkmKitap => Some("bkmkitap.com"),
            SourceId::Idefix => Some("idefix.com"),
            SourceId::GoogleBooks | SourceId::OpenLibrary => None,
        }
    }

    /// Find the source whose domain appears in `address`.
    pub fn from_address(address: &str) -> Option<Self> {
        let lower = address.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|source| source.domain().is_some_and(|d| lower.contains(d)))
    }

    /// Source order for an all-sources lookup of `identifier`.
    ///
    /// Turkish-market identifiers try the regional sites first.
    pub fn priority_for(identifier: &str) -> &'static [SourceId] {
        if REGIONAL_PREFIXES.iter().any(|p| identifier.starts_with(p)) {
            &Self::REGIONAL_FIRST
        } else {
            &Self::INTERNATIONAL_FIRST
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == wanted)
            .ok_or_else(|| AppError::unknown_source(s))
    }
}
