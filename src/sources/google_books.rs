// src/sources/google_books.rs

//! Google Books volumes API adapter.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{BindingKind, BookMetadata, SourceId};
use crate::sources::{SourceAdapter, SourceContext, prefer_isbn13};
use crate::utils::encode_query;
use crate::utils::html::{Sanitizer, prepare_description};
use crate::utils::http::fetch_json;
use crate::utils::text::{extract_year, non_empty};

const API_URL: &str = "https://www.googleapis.com/books/v1/volumes";

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: VolumeInfo,
    #[serde(default)]
    sale_info: Option<SaleInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    page_count: Option<u32>,
    language: Option<String>,
    image_links: Option<ImageLinks>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    info_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    extra_large: Option<String>,
    large: Option<String>,
    medium: Option<String>,
    small: Option<String>,
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl ImageLinks {
    /// Largest available image, served over https.
    fn best(&self) -> Option<String> {
        [
            &self.extra_large,
            &self.large,
            &self.medium,
            &self.small,
            &self.thumbnail,
            &self.small_thumbnail,
        ]
        .into_iter()
        .flatten()
        .next()
        .map(|link| link.replacen("http://", "https://", 1))
    }
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaleInfo {
    #[serde(default)]
    is_ebook: bool,
}

/// Client for the Google Books volumes API.
pub struct GoogleBooksSource {
    ctx: SourceContext,
}

impl GoogleBooksSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    async fn query(&self, q: &str, limit: usize) -> Result<Vec<BookMetadata>> {
        let url = format!("{API_URL}?q={}&maxResults={}", encode_query(q), limit);
        let response: VolumesResponse = fetch_json(self.ctx.fetcher.as_ref(), &url).await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(|volume| to_metadata(volume, self.ctx.sanitizer.as_ref()))
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for GoogleBooksSource {
    fn id(&self) -> SourceId {
        SourceId::GoogleBooks
    }

    async fn lookup_by_identifier(&self, identifier: &str) -> Result<Option<BookMetadata>> {
        let found = self.query(&format!("isbn:{identifier}"), 1).await?;
        Ok(found.into_iter().next().map(|mut book| {
            if book.identifier.is_empty() {
                book.identifier = identifier.to_string();
            }
            book
        }))
    }

    fn supports_search(&self) -> bool {
        true
    }

    async fn search_by_text(&self, query: &str) -> Result<Vec<BookMetadata>> {
        self.query(query, self.ctx.max_results).await
    }
}

fn to_metadata(volume: Volume, sanitizer: &dyn Sanitizer) -> Option<BookMetadata> {
    let info = volume.volume_info;
    let title = info.title.as_deref().and_then(non_empty);
    let subtitle = info.subtitle.as_deref().and_then(non_empty);
    let title = match (title, subtitle) {
        (Some(title), Some(subtitle)) => format!("{title}: {subtitle}"),
        (Some(title), None) => title,
        (None, _) => return None,
    };

    let identifier = prefer_isbn13(
        info.industry_identifiers
            .iter()
            .filter(|id| id.kind.starts_with("ISBN"))
            .map(|id| id.identifier.as_str()),
    )
    .unwrap_or_default();

    let binding = volume
        .sale_info
        .filter(|sale| sale.is_ebook)
        .map(|_| BindingKind::Ebook);

    Some(BookMetadata {
        identifier,
        title,
        author: info.authors.join(", "),
        publisher: info.publisher.as_deref().and_then(non_empty),
        published_year: info.published_date.as_deref().and_then(extract_year),
        page_count: info.page_count.filter(|n| *n > 0),
        description: info
            .description
            .as_deref()
            .and_then(|raw| prepare_description(raw, sanitizer)),
        language: info.language.as_deref().and_then(non_empty),
        cover_image_url: info.image_links.as_ref().and_then(ImageLinks::best),
        binding,
        source_url: info.info_link,
        ..BookMetadata::default()
    })
}
