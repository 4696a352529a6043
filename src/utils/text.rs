//! Text heuristics shared by the scraped sources.
//!
//! Retail product pages expose most details as loosely formatted
//! label/value pairs ("Sayfa Sayısı: 320", "Yayın Tarihi: 03.2019").
//! These helpers turn such values into typed fields, yielding `None`
//! rather than a zero or a guess when the value does not fit.

use std::sync::OnceLock;

use regex::Regex;

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)(\d{4})(?:\D|$)").expect("valid year regex"))
}

/// Collapse runs of whitespace and trim.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean text, returning `None` when nothing is left.
pub fn non_empty(s: &str) -> Option<String> {
    let cleaned = clean_text(s);
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Strip hyphens and whitespace from an ISBN-like identifier.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// True for a 10 or 13 digit identifier (after normalization).
pub fn is_valid_identifier(raw: &str) -> bool {
    let id = normalize_identifier(raw);
    (id.len() == 10 || id.len() == 13) && id.chars().all(|c| c.is_ascii_digit())
}

/// First positive integer in `text`, ignoring thousands separators.
///
/// "1.024 sayfa" → 1024. A missing or zero value is `None`.
pub fn extract_number(text: &str) -> Option<u32> {
    let compact: String = text.chars().filter(|c| *c != '.' && *c != ',').collect();
    digits_re()
        .find(&compact)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n > 0)
}

/// First plausible four-digit year in `text` ("03.2019" → 2019).
pub fn extract_year(text: &str) -> Option<u32> {
    year_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .find(|year| (1000..=2100).contains(year))
}

/// Pull an ISBN out of a value such as "ISBN: 978-975-07-1853-3".
pub fn extract_identifier(text: &str) -> Option<String> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .collect();
    match digits.len() {
        10 | 13 => Some(digits.to_uppercase()),
        _ => None,
    }
}

/// Lower-case with Turkish dotted/dotless I handled so that label
/// matching works for "SAYFA SAYISI" as well as "Sayfa Sayısı".
pub fn fold_label(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            'I' | 'ı' => 'i',
            'İ' => 'i',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
        .replace('\u{307}', "")
}

/// Field a product-page label row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelField {
    PageCount,
    Year,
    Language,
    Binding,
    Translator,
    Identifier,
    Publisher,
    OriginalTitle,
}

/// Classify a label by language-specific substrings.
///
/// Order matters. Labels about the original work ("Orijinal Adı",
/// "Orijinal Dili") are settled first: only the title is kept, since the
/// other fields describe the work rather than this edition. "kapak" is also
/// used by "kapak tasarımı" (cover designer), which is excluded explicitly.
pub fn classify_label(label: &str) -> Option<LabelField> {
    let l = fold_label(label);

    if l.contains("orijinal") || l.contains("original") {
        return ORIGINAL_TITLE_LABELS
            .iter()
            .any(|stem| l.contains(stem))
            .then_some(LabelField::OriginalTitle);
    }

    if l.contains("sayfa") {
        Some(LabelField::PageCount)
    } else if l.contains("isbn") || l.contains("barkod") {
        Some(LabelField::Identifier)
    } else if ["cevirmen", "çevirmen", "ceviri", "çeviri"]
        .iter()
        .any(|stem| l.contains(stem))
    {
        Some(LabelField::Translator)
    } else if l.contains("yayinevi") {
        Some(LabelField::Publisher)
    } else if l.contains("yil") || l.contains("tarih") {
        Some(LabelField::Year)
    } else if l.contains("cilt") || (l.contains("kapak") && !l.contains("tasarim")) {
        Some(LabelField::Binding)
    } else if l.starts_with("dil") || l.contains(" dil") {
        Some(LabelField::Language)
    } else {
        None
    }
}

/// Folded stems of labels naming the original title.
const ORIGINAL_TITLE_LABELS: [&str; 4] = [
    "orijinal ad",
    "orijinal isim",
    "original title",
    "original name",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("978-975-07 1853-3"), "9789750718533");
        assert_eq!(normalize_identifier(" 0140449132 "), "0140449132");
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("978-975-07-1853-3"));
        assert!(is_valid_identifier("0140449132"));
        assert!(!is_valid_identifier("12345"));
        assert!(!is_valid_identifier("97897507185ab"));
    }

    #[test]
    fn test_extract_number() {
        assert_eq!(extract_number("320"), Some(320));
        assert_eq!(extract_number("Sayfa Sayısı: 320"), Some(320));
        assert_eq!(extract_number("1.024 sayfa"), Some(1024));
        assert_eq!(extract_number("yok"), None);
        assert_eq!(extract_number("0"), None);
        assert_eq!(extract_number(""), None);
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("03.2019"), Some(2019));
        assert_eq!(extract_year("2015-05-01"), Some(2015));
        assert_eq!(extract_year("Mart 2021"), Some(2021));
        assert_eq!(extract_year("12345"), None);
        assert_eq!(extract_year("bilinmiyor"), None);
    }

    #[test]
    fn test_extract_identifier() {
        assert_eq!(
            extract_identifier("978-975-07-1853-3"),
            Some("9789750718533".to_string())
        );
        assert_eq!(extract_identifier("123"), None);
    }

    #[test]
    fn test_classify_label() {
        assert_eq!(classify_label("Sayfa Sayısı:"), Some(LabelField::PageCount));
        assert_eq!(classify_label("SAYFA SAYISI"), Some(LabelField::PageCount));
        assert_eq!(classify_label("Yayın Tarihi:"), Some(LabelField::Year));
        assert_eq!(classify_label("Basım Yılı"), Some(LabelField::Year));
        assert_eq!(classify_label("Dil:"), Some(LabelField::Language));
        assert_eq!(classify_label("Cilt Tipi:"), Some(LabelField::Binding));
        assert_eq!(classify_label("Kapak Türü"), Some(LabelField::Binding));
        assert_eq!(classify_label("Kapak Tasarımı"), None);
        assert_eq!(classify_label("Çevirmen:"), Some(LabelField::Translator));
        assert_eq!(classify_label("Barkod"), Some(LabelField::Identifier));
        assert_eq!(
            classify_label("Kitap Orijinal Adı"),
            Some(LabelField::OriginalTitle)
        );
        assert_eq!(classify_label("Original Title"), Some(LabelField::OriginalTitle));
        assert_eq!(classify_label("Orijinal Dili"), None);
        assert_eq!(classify_label("ORİJİNAL DİLİ:"), None);
        assert_eq!(classify_label("Kağıt Cinsi:"), None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Kürk \n Mantolu\tMadonna "), "Kürk Mantolu Madonna");
        assert_eq!(non_empty(" \n "), None);
    }
}
