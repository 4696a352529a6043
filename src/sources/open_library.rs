// src/sources/open_library.rs

//! Open Library adapter.
//!
//! Identifier lookups combine two endpoints: the books API (`jscmd=data`)
//! for the bibliographic record and the edition record for the
//! description and language, which the books API omits. Descriptions are
//! either a bare string or a `{type, value}` object and usually plain
//! text.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{BookMetadata, SourceId};
use crate::sources::{SourceAdapter, SourceContext, prefer_isbn13};
use crate::utils::encode_query;
use crate::utils::html::{Sanitizer, prepare_description};
use crate::utils::http::fetch_json;
use crate::utils::text::{extract_year, non_empty};

const ORIGIN: &str = "https://openlibrary.org";
const COVERS_ORIGIN: &str = "https://covers.openlibrary.org";

#[derive(Debug, Default, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Cover {
    small: Option<String>,
    medium: Option<String>,
    large: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Identifiers {
    #[serde(default)]
    isbn_13: Vec<String>,
    #[serde(default)]
    isbn_10: Vec<String>,
}

/// Record shape of `api/books?jscmd=data`.
#[derive(Debug, Default, Deserialize)]
struct BookData {
    #[serde(default)]
    title: String,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<Named>,
    #[serde(default)]
    publishers: Vec<Named>,
    publish_date: Option<String>,
    number_of_pages: Option<u32>,
    cover: Option<Cover>,
    identifiers: Option<Identifiers>,
    url: Option<String>,
}

/// Text fields come either bare or wrapped in a typed object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextValue {
    Plain(String),
    Typed { value: String },
}

impl TextValue {
    fn into_string(self) -> String {
        match self {
            TextValue::Plain(s) | TextValue::Typed { value: s } => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeyRef {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct Contributor {
    #[serde(default)]
    role: String,
    #[serde(default)]
    name: String,
}

/// Subset of the edition record (`isbn/<id>.json`).
#[derive(Debug, Default, Deserialize)]
struct Edition {
    description: Option<TextValue>,
    #[serde(default)]
    languages: Vec<KeyRef>,
    #[serde(default)]
    contributors: Vec<Contributor>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    publisher: Vec<String>,
    first_publish_year: Option<u32>,
    number_of_pages_median: Option<u32>,
    #[serde(default)]
    isbn: Vec<String>,
    cover_i: Option<i64>,
    key: Option<String>,
    #[serde(default)]
    language: Vec<String>,
}

/// Client for the Open Library APIs.
pub struct OpenLibrarySource {
    ctx: SourceContext,
}

impl OpenLibrarySource {
    pub fn new(ctx: SourceContext) -> Self {
        Self { ctx }
    }

    async fn fetch_edition(&self, identifier: &str) -> Result<Edition> {
        let url = format!("{ORIGIN}/isbn/{identifier}.json");
        fetch_json(self.ctx.fetcher.as_ref(), &url).await
    }
}

#[async_trait]
impl SourceAdapter for OpenLibrarySource {
    fn id(&self) -> SourceId {
        SourceId::OpenLibrary
    }

    async fn lookup_by_identifier(&self, identifier: &str) -> Result<Option<BookMetadata>> {
        let url = format!("{ORIGIN}/api/books?bibkeys=ISBN:{identifier}&format=json&jscmd=data");
        let mut records: HashMap<String, BookData> =
            fetch_json(self.ctx.fetcher.as_ref(), &url).await?;

        let Some(data) = records.remove(&format!("ISBN:{identifier}")) else {
            return Ok(None);
        };
        let Some(mut book) = from_book_data(data) else {
            return Ok(None);
        };
        if book.identifier.is_empty() {
            book.identifier = identifier.to_string();
        }

        // The edition record only adds detail; the book stands without it.
        match self.fetch_edition(identifier).await {
            Ok(edition) => apply_edition(&mut book, edition, self.ctx.sanitizer.as_ref()),
            Err(e) => log::debug!("open_library: no edition record for {}: {}", identifier, e),
        }

        Ok(Some(book))
    }

    fn supports_search(&self) -> bool {
        true
    }

    async fn search_by_text(&self, query: &str) -> Result<Vec<BookMetadata>> {
        let url = format!(
            "{ORIGIN}/search.json?q={}&limit={}",
            encode_query(query),
            self.ctx.max_results
        );
        let response: SearchResponse = fetch_json(self.ctx.fetcher.as_ref(), &url).await?;
        Ok(response
            .docs
            .into_iter()
            .take(self.ctx.max_results)
            .filter_map(from_search_doc)
            .collect())
    }
}

fn from_book_data(data: BookData) -> Option<BookMetadata> {
    let title = match (non_empty(&data.title), data.subtitle.as_deref().and_then(non_empty)) {
        (Some(title), Some(subtitle)) => format!("{title}: {subtitle}"),
        (Some(title), None) => title,
        (None, _) => return None,
    };

    let identifier = data
        .identifiers
        .as_ref()
        .and_then(|ids| {
            prefer_isbn13(
                ids.isbn_13
                    .iter()
                    .chain(ids.isbn_10.iter())
                    .map(String::as_str),
            )
        })
        .unwrap_or_default();

    let author = data
        .authors
        .iter()
        .map(|a| a.name.trim())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    Some(BookMetadata {
        identifier,
        title,
        author,
        publisher: data.publishers.first().and_then(|p| non_empty(&p.name)),
        published_year: data.publish_date.as_deref().and_then(extract_year),
        page_count: data.number_of_pages.filter(|n| *n > 0),
        cover_image_url: data.cover.and_then(|c| c.large.or(c.medium).or(c.small)),
        source_url: data.url,
        ..BookMetadata::default()
    })
}

/// Language keys look like `/languages/tur`.
fn language_code(key: &KeyRef) -> Option<String> {
    key.key.rsplit('/').next().and_then(non_empty)
}

fn apply_edition(book: &mut BookMetadata, edition: Edition, sanitizer: &dyn Sanitizer) {
    book.description = edition
        .description
        .map(TextValue::into_string)
        .and_then(|raw| prepare_description(&raw, sanitizer));
    book.language = edition.languages.first().and_then(language_code);

    let translators: Vec<&str> = edition
        .contributors
        .iter()
        .filter(|c| c.role.to_lowercase().contains("translat"))
        .map(|c| c.name.trim())
        .filter(|name| !name.is_empty())
        .collect();
    if !translators.is_empty() {
        book.translator = Some(translators.join(", "));
    }
}

fn from_search_doc(doc: SearchDoc) -> Option<BookMetadata> {
    let title = non_empty(&doc.title)?;
    Some(BookMetadata {
        identifier: prefer_isbn13(doc.isbn.iter().map(String::as_str)).unwrap_or_default(),
        title,
        author: doc.author_name.join(", "),
        publisher: doc.publisher.first().and_then(|p| non_empty(p)),
        published_year: doc.first_publish_year.filter(|y| *y > 0),
        page_count: doc.number_of_pages_median.filter(|n| *n > 0),
        language: doc.language.first().and_then(|l| non_empty(l)),
        cover_image_url: doc
            .cover_i
            .filter(|id| *id > 0)
            .map(|id| format!("{COVERS_ORIGIN}/b/id/{id}-L.jpg")),
        source_url: doc.key.map(|key| format!("{ORIGIN}{key}")),
        ..BookMetadata::default()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sources::testing::FixtureFetcher;
    use crate::sources::SourceContext;
    use crate::utils::html::AllowListSanitizer;

    const BOOKS: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/fixtures/open_library_books.json"
    ));
    const EDITION: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/fixtures/open_library_edition.json"
    ));
    const SEARCH: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/fixtures/open_library_search.json"
    ));

    fn lookup_fixture() -> BookMetadata {
        let mut records: HashMap<String, BookData> = serde_json::from_str(BOOKS).unwrap();
        let data = records.remove("ISBN:9780140449136").unwrap();
        let mut book = from_book_data(data).unwrap();
        let edition: Edition = serde_json::from_str(EDITION).unwrap();
        apply_edition(&mut book, edition, &AllowListSanitizer);
        book
    }

    #[test]
    fn test_book_data_mapping() {
        let book = lookup_fixture();
        assert_eq!(book.title, "Crime and Punishment");
        assert_eq!(book.author, "Fyodor Dostoyevsky");
        assert_eq!(book.identifier, "9780140449136");
        assert_eq!(book.publisher.as_deref(), Some("Penguin Books"));
        assert_eq!(book.published_year, Some(2003));
        assert_eq!(book.page_count, Some(671));
        assert_eq!(
            book.cover_image_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/8479576-L.jpg")
        );
        assert_eq!(book.language.as_deref(), Some("eng"));
        assert_eq!(book.translator.as_deref(), Some("David McDuff"));
    }

    #[test]
    fn test_plain_description_is_paragraph_split() {
        let book = lookup_fixture();
        assert_eq!(
            book.description.as_deref(),
            Some("<p>Raskolnikov, an impoverished student,<br>commits a murder.</p><p>A new translation.</p>")
        );
    }

    #[test]
    fn test_typed_and_plain_text_values() {
        let typed: Edition =
            serde_json::from_str(r#"{"description": {"type": "/type/text", "value": "Hi"}}"#)
                .unwrap();
        assert_eq!(typed.description.unwrap().into_string(), "Hi");

        let plain: Edition = serde_json::from_str(r#"{"description": "Hello"}"#).unwrap();
        assert_eq!(plain.description.unwrap().into_string(), "Hello");
    }

    #[test]
    fn test_search_docs() {
        let response: SearchResponse = serde_json::from_str(SEARCH).unwrap();
        let books: Vec<_> = response.docs.into_iter().filter_map(from_search_doc).collect();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Crime and Punishment");
        assert_eq!(books[0].identifier, "9780140449136");
        assert_eq!(
            books[0].source_url.as_deref(),
            Some("https://openlibrary.org/works/OL166894W")
        );
        assert_eq!(books[1].cover_image_url, None);
    }

    const BOOKS_URL: &str =
        "https://openlibrary.org/api/books?bibkeys=ISBN:9780140449136&format=json&jscmd=data";
    const EDITION_URL: &str = "https://openlibrary.org/isbn/9780140449136.json";

    #[tokio::test]
    async fn test_lookup_merges_edition_record() {
        let fetcher = Arc::new(
            FixtureFetcher::new()
                .page(BOOKS_URL, "open_library_books.json")
                .page(EDITION_URL, "open_library_edition.json"),
        );
        let source = OpenLibrarySource::new(SourceContext::new(fetcher.clone()));

        let book = source
            .lookup_by_identifier("9780140449136")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(book.title, "Crime and Punishment");
        assert_eq!(book.translator.as_deref(), Some("David McDuff"));
        assert!(book.description.is_some());
        assert_eq!(
            fetcher.requests(),
            vec![BOOKS_URL.to_string(), EDITION_URL.to_string()]
        );
    }

    #[tokio::test]
    async fn test_lookup_survives_missing_edition() {
        let fetcher = Arc::new(FixtureFetcher::new().page(BOOKS_URL, "open_library_books.json"));
        let source = OpenLibrarySource::new(SourceContext::new(fetcher));

        let book = source
            .lookup_by_identifier("9780140449136")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(book.page_count, Some(671));
        assert_eq!(book.description, None);
        assert_eq!(book.language, None);
    }

    #[tokio::test]
    async fn test_lookup_unknown_identifier() {
        let url =
            "https://openlibrary.org/api/books?bibkeys=ISBN:0000000000&format=json&jscmd=data";
        let fetcher = Arc::new(FixtureFetcher::new().body(url, "{}"));
        let source = OpenLibrarySource::new(SourceContext::new(fetcher.clone()));

        assert_eq!(source.lookup_by_identifier("0000000000").await.unwrap(), None);
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_search_by_text() {
        let url = "https://openlibrary.org/search.json?q=crime+and+punishment&limit=10";
        let fetcher = Arc::new(FixtureFetcher::new().page(url, "open_library_search.json"));
        let source = OpenLibrarySource::new(SourceContext::new(fetcher));

        let books = source.search_by_text("crime and punishment").await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].identifier, "9780140449136");
    }
}
