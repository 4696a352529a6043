//! Shared machinery for the scraped retail sites.
//!
//! A site only describes its pages through [`ScrapedSite`];
//! [`ScrapedSource`] turns that into a [`SourceAdapter`] with the
//! search-then-detail identifier lookup every retail site uses.

use std::marker::PhantomData;

use async_trait::async_trait;
use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};
use crate::models::{BindingKind, BookMetadata, SourceId};
use crate::sources::{SourceAdapter, SourceContext};
use crate::utils::html::Sanitizer;
use crate::utils::resolve;
use crate::utils::text::{
    LabelField, classify_label, clean_text, extract_identifier, extract_number, extract_year,
    non_empty,
};

/// Page layout of one retail site.
///
/// Parsing works on the page body only, so every function here can be
/// tested against recorded pages.
pub trait ScrapedSite: Send + Sync + 'static {
    const ID: SourceId;

    /// Site search address for a free-text query or identifier.
    fn search_url(query: &str) -> String;

    /// Address of the first product in a search results page.
    fn first_result_url(html: &str) -> Result<Option<String>>;

    /// Partial records from a search results page.
    fn parse_search(html: &str, limit: usize) -> Result<Vec<BookMetadata>>;

    /// Full record from a product page.
    fn parse_detail(
        html: &str,
        page_url: &str,
        sanitizer: &dyn Sanitizer,
    ) -> Result<Option<BookMetadata>>;
}

/// [`SourceAdapter`] for any [`ScrapedSite`].
pub struct ScrapedSource<S> {
    ctx: SourceContext,
    site: PhantomData<fn() -> S>,
}

impl<S: ScrapedSite> ScrapedSource<S> {
    pub fn new(ctx: SourceContext) -> Self {
        Self {
            ctx,
            site: PhantomData,
        }
    }

    async fn fetch_detail(&self, url: &str) -> Result<Option<BookMetadata>> {
        let body = self.ctx.fetcher.get_text(url).await?;
        S::parse_detail(&body, url, self.ctx.sanitizer.as_ref())
    }
}

#[async_trait]
impl<S: ScrapedSite> SourceAdapter for ScrapedSource<S> {
    fn id(&self) -> SourceId {
        S::ID
    }

    async fn lookup_by_identifier(&self, identifier: &str) -> Result<Option<BookMetadata>> {
        let body = self.ctx.fetcher.get_text(&S::search_url(identifier)).await?;
        let Some(detail_url) = S::first_result_url(&body)? else {
            log::debug!("{}: no search hit for {}", S::ID, identifier);
            return Ok(None);
        };

        let found = self.fetch_detail(&detail_url).await?;
        Ok(found.map(|mut book| {
            if book.identifier.is_empty() {
                book.identifier = identifier.to_string();
            }
            book
        }))
    }

    fn supports_address(&self) -> bool {
        true
    }

    async fn lookup_by_address(&self, address: &str) -> Result<Option<BookMetadata>> {
        self.fetch_detail(address).await
    }

    fn supports_search(&self) -> bool {
        true
    }

    async fn search_by_text(&self, query: &str) -> Result<Vec<BookMetadata>> {
        let body = self.ctx.fetcher.get_text(&S::search_url(query)).await?;
        S::parse_search(&body, self.ctx.max_results)
    }
}

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Text of the first element matching any of `selectors`, tried in order.
pub(crate) fn first_text(root: ElementRef<'_>, selectors: &[&str]) -> Result<Option<String>> {
    for s in selectors {
        let selector = parse_selector(s)?;
        let found = root
            .select(&selector)
            .map(|el| clean_text(&el.text().collect::<String>()))
            .find(|text| !text.is_empty());
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// Texts of all elements matching the first selector that matches anything,
/// joined with ", ". Used for author lines with several names.
pub(crate) fn joined_text(root: ElementRef<'_>, selectors: &[&str]) -> Result<Option<String>> {
    for s in selectors {
        let selector = parse_selector(s)?;
        let mut names: Vec<String> = Vec::new();
        for el in root.select(&selector) {
            let name = clean_text(&el.text().collect::<String>());
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        if !names.is_empty() {
            return Ok(Some(names.join(", ")));
        }
    }
    Ok(None)
}

/// First non-empty value of any of `attrs` on the first element matching
/// any of `selectors`.
pub(crate) fn first_attr(
    root: ElementRef<'_>,
    selectors: &[&str],
    attrs: &[&str],
) -> Result<Option<String>> {
    for s in selectors {
        let selector = parse_selector(s)?;
        for el in root.select(&selector) {
            let value = attrs
                .iter()
                .filter_map(|attr| el.value().attr(attr))
                .map(str::trim)
                .find(|v| !v.is_empty() && !v.starts_with("data:"));
            if let Some(value) = value {
                return Ok(Some(value.to_string()));
            }
        }
    }
    Ok(None)
}

/// Inner HTML of the first non-empty element matching any of `selectors`.
pub(crate) fn first_inner_html(root: ElementRef<'_>, selectors: &[&str]) -> Result<Option<String>> {
    for s in selectors {
        let selector = parse_selector(s)?;
        let found = root
            .select(&selector)
            .find(|el| !clean_text(&el.text().collect::<String>()).is_empty())
            .map(|el| el.inner_html());
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// Split a detail row into label and value.
///
/// Rows come either as two cells (`<td>Label</td><td>Value</td>`,
/// `<span>Label</span><span>Value</span>`) or as one "Label: Value" text.
pub(crate) fn label_value(row: ElementRef<'_>) -> Option<(String, String)> {
    let cells: Vec<String> = row
        .children()
        .filter_map(ElementRef::wrap)
        .map(|cell| clean_text(&cell.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect();

    if cells.len() >= 2 {
        let label = cells[0].trim_end_matches(':').trim().to_string();
        let value = cells[1..].join(" ");
        return Some((label, value));
    }

    let text = clean_text(&row.text().collect::<String>());
    let (label, value) = text.split_once(':')?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some((label.trim().to_string(), value.to_string()))
}

/// Fill the field a label describes. Unknown labels and values that do not
/// parse leave the record untouched.
pub(crate) fn apply_label(book: &mut BookMetadata, label: &str, value: &str) {
    let Some(field) = classify_label(label) else {
        return;
    };
    match field {
        LabelField::PageCount => fill(&mut book.page_count, extract_number(value)),
        LabelField::Year => fill(&mut book.published_year, extract_year(value)),
        LabelField::Language => fill(&mut book.language, non_empty(value)),
        LabelField::Binding => fill(&mut book.binding, BindingKind::infer(value)),
        LabelField::Translator => fill(&mut book.translator, non_empty(value)),
        LabelField::OriginalTitle => fill(&mut book.original_title, non_empty(value)),
        LabelField::Identifier => {
            if let Some(id) = extract_identifier(value) {
                book.identifier = id;
            }
        }
        LabelField::Publisher => {
            if book.publisher.is_none() {
                book.publisher = non_empty(value);
            }
        }
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Apply every label/value row matched by any of `row_selectors`.
pub(crate) fn apply_label_rows(
    root: ElementRef<'_>,
    row_selectors: &[&str],
    book: &mut BookMetadata,
) -> Result<()> {
    for s in row_selectors {
        let selector = parse_selector(s)?;
        for row in root.select(&selector) {
            if let Some((label, value)) = label_value(row) {
                apply_label(book, &label, &value);
            }
        }
    }
    Ok(())
}

/// Resolve a possibly site-relative address against the site origin.
pub(crate) fn absolute(origin: &str, href: &str) -> String {
    resolve(origin, href.trim()).unwrap_or_else(|| href.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("[[invalid").is_err());
        assert!(parse_selector("div.product-cr .name a").is_ok());
    }

    #[test]
    fn test_label_value_cells() {
        let doc = Html::parse_fragment(
            "<table><tr><td>Sayfa Sayısı:</td><td>320</td></tr></table>",
        );
        let sel = parse_selector("tr").unwrap();
        let row = doc.select(&sel).next().unwrap();
        assert_eq!(
            label_value(row),
            Some(("Sayfa Sayısı".to_string(), "320".to_string()))
        );
    }

    #[test]
    fn test_label_value_inline() {
        let doc = Html::parse_fragment("<ul><li>Basım Yılı: 2019</li></ul>");
        let sel = parse_selector("li").unwrap();
        let row = doc.select(&sel).next().unwrap();
        assert_eq!(
            label_value(row),
            Some(("Basım Yılı".to_string(), "2019".to_string()))
        );
    }

    #[test]
    fn test_apply_label_numeric_absent_not_zero() {
        let mut book = BookMetadata::default();
        apply_label(&mut book, "Sayfa Sayısı", "belirtilmemiş");
        assert_eq!(book.page_count, None);

        apply_label(&mut book, "Sayfa Sayısı", "320");
        assert_eq!(book.page_count, Some(320));
    }

    #[test]
    fn test_original_language_row_is_ignored() {
        let mut book = BookMetadata::default();
        apply_label(&mut book, "Dil", "Türkçe");
        apply_label(&mut book, "Orijinal Dili", "Rusça");
        assert_eq!(book.original_title, None);
        assert_eq!(book.language.as_deref(), Some("Türkçe"));

        apply_label(&mut book, "Orijinal Adı", "Prestupleniye i nakazaniye");
        assert_eq!(
            book.original_title.as_deref(),
            Some("Prestupleniye i nakazaniye")
        );
    }

    #[test]
    fn test_first_text_falls_back() {
        let doc = Html::parse_document("<h1 class='x'> Başlık </h1>");
        let text = first_text(doc.root_element(), &["h1.missing", "h1"]).unwrap();
        assert_eq!(text, Some("Başlık".to_string()));
    }

    #[test]
    fn test_absolute() {
        assert_eq!(
            absolute("https://www.bkmkitap.com", "/Uploads/a.jpg"),
            "https://www.bkmkitap.com/Uploads/a.jpg"
        );
        assert_eq!(
            absolute("https://www.bkmkitap.com", "https://cdn.x/a.jpg"),
            "https://cdn.x/a.jpg"
        );
    }
}
