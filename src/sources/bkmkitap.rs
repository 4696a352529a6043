// src/sources/bkmkitap.rs

//! BKM Kitap adapter.
//!
//! Same two-step scrape as Kitapyurdu. Product details are a list of
//! label/value items under `#productInfo`, and images are served from
//! site-relative `/Uploads/...` paths.

use scraper::Html;

use crate::error::{AppError, Result};
use crate::models::{BookMetadata, SourceId};
use crate::sources::scrape::{
    ScrapedSite, ScrapedSource, absolute, apply_label_rows, first_attr, first_inner_html,
    first_text, joined_text, parse_selector,
};
use crate::utils::encode_query;
use crate::utils::html::{Sanitizer, prepare_description};

const ORIGIN: &str = "https://www.bkmkitap.com";

const RESULT_ENTRY: &str = ".product-item";
const RESULT_LINK: [&str; 2] = [".product-title a[href]", "a[href]"];

const TITLE: [&str; 3] = ["h1#productName", ".product-title h1", "h1"];
const AUTHORS: [&str; 2] = [".product-writer a", "a.writer"];
const PUBLISHER: [&str; 2] = [".product-publisher a", "a.publisher"];
const COVER: [&str; 3] = [
    "#productImage img",
    ".product-image img",
    "meta[property='og:image']",
];
const DESCRIPTION: [&str; 3] = [
    "#productDescription",
    ".product-description",
    "#productDetailTab .tab-content",
];
const INFO_ROWS: [&str; 2] = ["#productInfo li", ".product-features tr"];

/// Page layout of www.bkmkitap.com.
pub struct BkmKitap;

/// Scraper for www.bkmkitap.com.
pub type BkmKitapSource = ScrapedSource<BkmKitap>;

impl ScrapedSite for BkmKitap {
    const ID: SourceId = SourceId::BkmKitap;

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

pub(crate) fn first_result_url(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let entry_sel = parse_selector(RESULT_ENTRY)?;

    for entry in document.select(&entry_sel) {
        if let Some(href) = first_attr(entry, &RESULT_LINK, &["href"])? {
            return Ok(Some(absolute(ORIGIN, &href)));
        }
    }
    Ok(None)
}

pub(crate) fn parse_search(html: &str, limit: usize) -> Result<Vec<BookMetadata>> {
    let document = Html::parse_document(html);
    let entry_sel = parse_selector(RESULT_ENTRY)?;
    let mut results = Vec::new();

    for entry in document.select(&entry_sel).take(limit) {
        let Some(title) = first_text(entry, &[".product-title"])? else {
            continue;
        };
        let mut book = BookMetadata::new(
            title,
            joined_text(entry, &[".product-writer a", ".product-writer"])?.unwrap_or_default(),
        );
        book.publisher = first_text(entry, &[".product-publisher"])?;
        book.cover_image_url = first_attr(entry, &["img"], &["data-src", "src"])?
            .map(|src| absolute(ORIGIN, &src));
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
        return Err(AppError::parse("bkmkitap", "product title not found"));
    };

    let mut book = BookMetadata::new(title, joined_text(root, &AUTHORS)?.unwrap_or_default());
    book.publisher = first_text(root, &PUBLISHER)?;
    book.cover_image_url = first_attr(root, &COVER, &["data-src", "src", "content"])?
        .map(|src| absolute(ORIGIN, &src));
    book.description = first_inner_html(root, &DESCRIPTION)?
        .and_then(|raw| prepare_description(&raw, sanitizer));
    apply_label_rows(root, &INFO_ROWS, &mut book)?;
    book.source_url = Some(page_url.to_string());

    Ok(book.into_found())
}
