//! Description HTML handling.
//!
//! Descriptions reach callers as a restricted HTML subset. Sources hand
//! over either raw markup or plain text; plain text is converted to
//! paragraphs first and both paths go through a [`Sanitizer`].

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Tags that survive sanitization.
const ALLOWED_TAGS: [&str; 10] = ["p", "br", "b", "strong", "i", "em", "u", "ul", "ol", "li"];

/// Elements whose content is dropped along with the tag.
const DROPPED_TAGS: [&str; 4] = ["script", "style", "iframe", "noscript"];

/// Restricts description markup to a safe subset.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> String;
}

/// Keeps a small allow-list of formatting tags and the text of everything
/// else. Attributes are always removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowListSanitizer;

impl Sanitizer for AllowListSanitizer {
    fn sanitize(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        write_children(fragment.root_element(), &mut out);
        out.trim().to_string()
    }
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_into(text, out),
            Node::Element(el) => {
                let name = el.name();
                if DROPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                if name == "br" {
                    out.push_str("<br>");
                } else if ALLOWED_TAGS.contains(&name) {
                    out.push('<');
                    out.push_str(name);
                    out.push('>');
                    write_children(child_ref, out);
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                } else {
                    write_children(child_ref, out);
                }
            }
            _ => {}
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[a-zA-Z][a-zA-Z0-9]*[^<>]*>").expect("valid tag regex"))
}

fn blank_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n").expect("valid blank line regex"))
}

/// True when `text` already contains markup.
pub fn looks_like_html(text: &str) -> bool {
    tag_re().is_match(text)
}

/// Convert plain text to paragraphs: blank lines split paragraphs and the
/// remaining newlines become `<br>`.
pub fn plain_text_to_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    blank_line_re()
        .split(&normalized)
        .map(str::trim)
        .filter(|para| !para.is_empty())
        .map(|para| {
            let mut escaped = String::with_capacity(para.len());
            escape_into(para, &mut escaped);
            format!("<p>{}</p>", escaped.replace('\n', "<br>"))
        })
        .collect()
}

/// Turn a raw description (markup or plain text) into sanitized HTML.
pub fn prepare_description(raw: &str, sanitizer: &dyn Sanitizer) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let html = if looks_like_html(raw) {
        sanitizer.sanitize(raw)
    } else {
        sanitizer.sanitize(&plain_text_to_html(raw))
    };
    if html.is_empty() { None } else { Some(html) }
}
