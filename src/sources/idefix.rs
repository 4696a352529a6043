// src/sources/idefix.rs

//! idefix adapter.
//!
//! Product addresses end in `-p-<digits>`. Cover images are templated:
//! the page ships `{width}x{height}` in the path and the client fills in
//! a size, so the adapter does the same before resolving the address.

use std::sync::OnceLock;

use regex::Regex;
use scraper::Html;

use crate::error::{AppError, Result};
use crate::models::{BookMetadata, SourceId};
use crate::sources::scrape::{
    ScrapedSite, ScrapedSource, absolute, apply_label_rows, first_attr, first_inner_html,
    first_text, joined_text, parse_selector,
};
use crate::utils::encode_query;
use crate::utils::html::{Sanitizer, prepare_description};

const ORIGIN: &str = "https://www.idefix.com";

/// Size segment substituted into templated image addresses.
const IMAGE_SIZE: &str = "600x900";
const IMAGE_PLACEHOLDERS: [&str; 2] = ["{width}x{height}", "%7Bwidth%7Dx%7Bheight%7D"];

const RESULT_ENTRY: &str = ".product-card";
const RESULT_LINK: [&str; 2] = ["a.product-card__link[href]", "a[href*='-p-']"];

const TITLE: [&str; 2] = ["h1.product-name", "h1"];
const AUTHORS: [&str; 2] = [".product-authors a", "a[href*='/yazar/']"];
const PUBLISHER: [&str; 2] = [".product-publisher a", "a[href*='/yayinevi/']"];
const COVER: [&str; 3] = [
    "img.product-image",
    ".product-gallery img",
    "meta[property='og:image']",
];
const DESCRIPTION: [&str; 2] = [".product-description", "#description"];
const SPEC_ROWS: [&str; 2] = [".product-specs li", ".product-specs tr"];

fn product_href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-p-\d+(?:[/?#]|$)").expect("valid product regex"))
}

/// Page layout of www.idefix.com.
pub struct Idefix;

/// Scraper for www.idefix.com.
pub type IdefixSource = ScrapedSource<Idefix>;

impl ScrapedSite for Idefix {
    const ID: SourceId = SourceId::Idefix;

    fn search_url(query: &str) -> String {
        format!("{ORIGIN}/arama?q={}", encode_query(query))
    }

    fn first_result_url(html: &str) -> Result<Option<String>> {
        first_result_url(html)
    }

    fn parse_search(html: &str, limit: usize) -> Result<Vec<BookMetadata>> {
        parse_search(html, limit)
    }

    fn parse_detail(
        html: &str,
        page_url: &str,
        sanitizer: &dyn Sanitizer,
    ) -> Result<Option<BookMetadata>> {
        parse_detail(html, page_url, sanitizer)
    }
}

/// Fill the size template and make the address absolute.
pub(crate) fn cover_url(src: &str) -> String {
    let sized = IMAGE_PLACEHOLDERS
        .iter()
        .fold(src.to_string(), |acc, placeholder| {
            acc.replace(placeholder, IMAGE_SIZE)
        });
    absolute(ORIGIN, &sized)
}

pub(crate) fn first_result_url(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let entry_sel = parse_selector(RESULT_ENTRY)?;

    for entry in document.select(&entry_sel) {
        if let Some(href) = first_attr(entry, &RESULT_LINK, &["href"])? {
            return Ok(Some(absolute(ORIGIN, &href)));
        }
    }

    // Layouts without product cards still link products by their address shape.
    let link_sel = parse_selector("a[href]")?;
    Ok(document
        .select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| product_href_re().is_match(href))
        .map(|href| absolute(ORIGIN, href)))
}

pub(crate) fn parse_search(html: &str, limit: usize) -> Result<Vec<BookMetadata>> {
    let document = Html::parse_document(html);
    let entry_sel = parse_selector(RESULT_ENTRY)?;
    let mut results = Vec::new();

    for entry in document.select(&entry_sel).take(limit) {
        let Some(title) = first_text(entry, &[".product-card__title"])? else {
            continue;
        };
        let mut book = BookMetadata::new(
            title,
            joined_text(entry, &[".product-card__author a", ".product-card__author"])?
                .unwrap_or_default(),
        );
        book.publisher = first_text(entry, &[".product-card__publisher"])?;
        book.cover_image_url =
            first_attr(entry, &["img"], &["data-src", "src"])?.map(|src| cover_url(&src));
        book.source_url = first_attr(entry, &RESULT_LINK, &["href"])?
            .map(|href| absolute(ORIGIN, &href));
        results.push(book);
    }
    Ok(results)
}

pub(crate) fn parse_detail(
    html: &str,
    page_url: &str,
    sanitizer: &dyn Sanitizer,
) -> Result<Option<BookMetadata>> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let Some(title) = first_text(root, &TITLE)? else {
        return Err(AppError::parse("idefix", "product title not found"));
    };

    let mut book = BookMetadata::new(title, joined_text(root, &AUTHORS)?.unwrap_or_default());
    book.publisher = first_text(root, &PUBLISHER)?;
    book.cover_image_url =
        first_attr(root, &COVER, &["data-src", "src", "content"])?.map(|src| cover_url(&src));
    book.description = first_inner_html(root, &DESCRIPTION)?
        .and_then(|raw| prepare_description(&raw, sanitizer));
    apply_label_rows(root, &SPEC_ROWS, &mut book)?;
    book.source_url = Some(page_url.to_string());

    Ok(book.into_found())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sources::testing::FixtureFetcher;
    use crate::sources::{SourceAdapter, SourceContext};
    use crate::models::BindingKind;
    use crate::utils::html::AllowListSanitizer;

    const DETAIL: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/fixtures/idefix_detail.html"
    ));
    const SEARCH: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/fixtures/idefix_search.html"
    ));
    const PAGE: &str = "https://www.idefix.com/suc-ve-ceza-p-41732";

    #[test]
    fn test_cover_url_fills_template() {
        assert_eq!(
            cover_url("/images/{width}x{height}/suc-ve-ceza.jpg"),
            "https://www.idefix.com/images/600x900/suc-ve-ceza.jpg"
        );
        assert_eq!(
            cover_url("https://cdn.idefix.com/%7Bwidth%7Dx%7Bheight%7D/a.jpg"),
            "https://cdn.idefix.com/600x900/a.jpg"
        );
        assert_eq!(
            cover_url("https://cdn.idefix.com/a.jpg"),
            "https://cdn.idefix.com/a.jpg"
        );
    }

    #[test]
    fn test_first_result_url() {
        assert_eq!(first_result_url(SEARCH).unwrap(), Some(PAGE.to_string()));
    }

    #[test]
    fn test_first_result_url_without_cards() {
        let html = r#"<html><body>
            <a href="/kampanyalar">Kampanyalar</a>
            <a href="/suc-ve-ceza-p-41732?ref=search">Suç ve Ceza</a>
        </body></html>"#;
        assert_eq!(
            first_result_url(html).unwrap(),
            Some("https://www.idefix.com/suc-ve-ceza-p-41732?ref=search".to_string())
        );
    }

    #[test]
    fn test_parse_detail_fields() {
        let book = parse_detail(DETAIL, PAGE, &AllowListSanitizer)
            .unwrap()
            .unwrap();

        assert_eq!(book.title, "Suç ve Ceza");
        assert_eq!(book.author, "Fyodor Mihayloviç Dostoyevski");
        assert_eq!(
            book.publisher.as_deref(),
            Some("Türkiye İş Bankası Kültür Yayınları")
        );
        assert_eq!(book.translator.as_deref(), Some("Mazlum Beyhan"));
        assert_eq!(book.page_count, Some(687));
        assert_eq!(book.published_year, Some(2019));
        assert_eq!(book.binding, Some(BindingKind::Paperback));
        assert_eq!(book.identifier, "9789754580900");
        assert_eq!(
            book.cover_image_url.as_deref(),
            Some("https://www.idefix.com/images/600x900/suc-ve-ceza.jpg")
        );
    }

    #[test]
    fn test_parse_search() {
        let results = parse_search(SEARCH, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Suç ve Ceza");
        assert_eq!(results[0].source_url.as_deref(), Some(PAGE));
        assert_eq!(
            results[0].cover_image_url.as_deref(),
            Some("https://www.idefix.com/images/600x900/suc-ve-ceza.jpg")
        );
    }

    #[tokio::test]
    async fn test_lookup_by_identifier_follows_first_hit() {
        let search_url = "https://www.idefix.com/arama?q=9789754580900";
        let fetcher = Arc::new(
            FixtureFetcher::new()
                .page(search_url, "idefix_search.html")
                .page(PAGE, "idefix_detail.html"),
        );
        let source = IdefixSource::new(SourceContext::new(fetcher.clone()));

        let book = source
            .lookup_by_identifier("9789754580900")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(book.title, "Suç ve Ceza");
        assert_eq!(book.translator.as_deref(), Some("Mazlum Beyhan"));
        assert_eq!(fetcher.requests()[1], PAGE);
    }

    #[tokio::test]
    async fn test_search_by_text() {
        let fetcher = Arc::new(FixtureFetcher::new().page(
            "https://www.idefix.com/arama?q=su%C3%A7+ve+ceza",
            "idefix_search.html",
        ));
        let source = IdefixSource::new(SourceContext::new(fetcher));

        let results = source.search_by_text("suç ve ceza").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_url.as_deref(), Some(PAGE));
    }
}
