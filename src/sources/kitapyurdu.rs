// src/sources/kitapyurdu.rs

//! Kitapyurdu adapter.
//!
//! Identifier lookup is a two-step scrape: the site search for the ISBN,
//! then the first hit's product page. Product pages carry an attribute
//! table of label/value rows ("Sayfa Sayısı", "Yayın Tarihi", "Cilt Tipi",
//! "Orijinal Adı", ...).

use scraper::Html;

use crate::error::{AppError, Result};
use crate::models::{BookMetadata, SourceId};
use crate::sources::scrape::{
    ScrapedSite, ScrapedSource, absolute, apply_label_rows, first_attr, first_inner_html,
    first_text, joined_text, parse_selector,
};
use crate::utils::encode_query;
use crate::utils::html::{Sanitizer, prepare_description};

const ORIGIN: &str = "https://www.kitapyurdu.com";

const RESULT_ENTRY: &str = ".product-cr";
const RESULT_LINK: [&str; 3] = [".name a[href]", ".image a[href]", "a[href*='/kitap/']"];

const TITLE: [&str; 3] = ["h1.pr_header__heading", "h1[itemprop='name']", "h1"];
const AUTHORS: [&str; 2] = [
    ".pr_producers__manufacturer .pr_producers__link",
    "a[itemprop='author']",
];
const PUBLISHER: [&str; 2] = [
    ".pr_producers__publisher .pr_producers__link",
    "a[itemprop='publisher']",
];
const COVER: [&str; 3] = [
    "img.js-jbox-book-cover",
    ".pr_images img",
    "meta[property='og:image']",
];
const DESCRIPTION: [&str; 3] = [
    "#description_text .info__text",
    "#description_text",
    "[itemprop='description']",
];
const ATTRIBUTE_ROWS: [&str; 1] = [".attributes table tr"];

/// Page layout of www.kitapyurdu.com.
pub struct Kitapyurdu;

/// Scraper for www.kitapyurdu.com.
pub type KitapyurduSource = ScrapedSource<Kitapyurdu>;

impl ScrapedSite for Kitapyurdu {
    const ID: SourceId = SourceId::Kitapyurdu;

    fn search_url(query: &str) -> String {
        format!(
            "{ORIGIN}/index.php?route=product/search&filter_name={}",
            encode_query(query)
        )
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

/// Address of the first product in a search results page.
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

/// Partial records from a search results page.
pub(crate) fn parse_search(html: &str, limit: usize) -> Result<Vec<BookMetadata>> {
    let document = Html::parse_document(html);
    let entry_sel = parse_selector(RESULT_ENTRY)?;
    let mut results = Vec::new();

    for entry in document.select(&entry_sel).take(limit) {
        let Some(title) = first_text(entry, &[".name span", ".name"])? else {
            continue;
        };
        let mut book = BookMetadata::new(
            title,
            joined_text(entry, &[".author a", ".author"])?.unwrap_or_default(),
        );
        book.publisher = first_text(entry, &[".publisher a", ".publisher"])?;
        book.cover_image_url = first_attr(entry, &[".image img", "img"], &["data-src", "src"])?
            .map(|src| absolute(ORIGIN, &src));
        book.source_url = first_attr(entry, &RESULT_LINK, &["href"])?
            .map(|href| absolute(ORIGIN, &href));
        results.push(book);
    }
    Ok(results)
}

/// Full record from a product page.
pub(crate) fn parse_detail(
    html: &str,
    page_url: &str,
    sanitizer: &dyn Sanitizer,
) -> Result<Option<BookMetadata>> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let Some(title) = first_text(root, &TITLE)? else {
        return Err(AppError::parse("kitapyurdu", "product title not found"));
    };

    let mut book = BookMetadata::new(title, joined_text(root, &AUTHORS)?.unwrap_or_default());
    book.publisher = first_text(root, &PUBLISHER)?;
    book.cover_image_url = first_attr(root, &COVER, &["data-src", "src", "content"])?
        .map(|src| absolute(ORIGIN, &src));
    book.description = first_inner_html(root, &DESCRIPTION)?
        .and_then(|raw| prepare_description(&raw, sanitizer));
    apply_label_rows(root, &ATTRIBUTE_ROWS, &mut book)?;
    book.source_url = Some(page_url.to_string());

    Ok(book.into_found())
}
