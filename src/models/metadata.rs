//! Canonical book metadata record.

use serde::{Deserialize, Serialize};

/// Physical (or digital) binding of a book edition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Paperback,
    Hardcover,
    Ebook,
}

impl BindingKind {
    /// Infer the binding from a free-form value such as "Karton Kapak".
    ///
    /// Low precision on purpose: anything unrecognized yields `None`.
    pub fn infer(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();

        // "ciltsiz" contains "cilt", so it must win over the hardcover stems.
        if lower.contains("ciltsiz") || lower.contains("karton") || lower.contains("ince kapak")
        {
            return Some(Self::Paperback);
        }
        if lower.contains("ciltli") || lower.contains("sert") || lower.contains("hardcover") {
            return Some(Self::Hardcover);
        }
        if lower.contains("paperback") {
            return Some(Self::Paperback);
        }
        if lower.contains("e-kitap") || lower.contains("ebook") || lower.contains("dijital") {
            return Some(Self::Ebook);
        }
        None
    }
}

/// Source-agnostic description of a book edition.
///
/// An empty `title` means the source found nothing usable; such records
/// are never handed to callers (see [`BookMetadata::into_found`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    /// ISBN-10 or ISBN-13 digits, empty when unknown
    #[serde(default)]
    pub identifier: String,

    pub title: String,

    /// Author line, possibly several names joined with ", "
    #[serde(default)]
    pub author: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,

    /// Sanitized HTML
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,

    /// Page the record was read from, used to fetch fuller detail later
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl BookMetadata {
    /// Create a record with just a title and author.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// True when the record is the "nothing found" sentinel.
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Collapse the empty-title sentinel into `None`.
    pub fn into_found(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }

    /// Key used to merge federated search results.
    pub fn dedup_key(&self) -> (String, String) {
        (
            self.title.trim().to_lowercase(),
            self.author.trim().to_lowercase(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_infer() {
        assert_eq!(
            BindingKind::infer("Karton Kapak"),
            Some(BindingKind::Paperback)
        );
        assert_eq!(BindingKind::infer("Ciltsiz"), Some(BindingKind::Paperback));
        assert_eq!(BindingKind::infer("Ciltli"), Some(BindingKind::Hardcover));
        assert_eq!(BindingKind::infer("Sert Kapak"), Some(BindingKind::Hardcover));
        assert_eq!(BindingKind::infer("E-Kitap"), Some(BindingKind::Ebook));
        assert_eq!(BindingKind::infer("1. Hamur"), None);
    }

    #[test]
    fn test_into_found_drops_sentinel() {
        assert!(BookMetadata::new("", "Someone").into_found().is_none());
        assert!(BookMetadata::new("  ", "").into_found().is_none());
        assert!(BookMetadata::new("Tutunamayanlar", "").into_found().is_some());
    }

    #[test]
    fn test_dedup_key_ignores_case() {
        let a = BookMetadata::new("Kürk Mantolu Madonna", "Sabahattin Ali");
        let b = BookMetadata::new("KÜRK MANTOLU MADONNA ", "sabahattin ali");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let mut book = BookMetadata::new("Title", "Author");
        book.page_count = Some(320);
        book.binding = Some(BindingKind::Paperback);

        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["pageCount"], 320);
        assert_eq!(json["binding"], "paperback");
        assert!(json.get("publisher").is_none());
    }
}
