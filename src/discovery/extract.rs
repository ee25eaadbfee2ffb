//! Markup inspection seam
//!
//! All HTML heuristics live behind these two functions so the pipeline never
//! touches markup directly and the implementation can be swapped out without
//! disturbing the stages that consume it.

use scraper::{Html, Selector};

/// An anchor element with its resolved-later href and visible text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Extract every `<a href>` element with its visible text.
pub fn extract_anchors(html: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let text: String = element.text().collect();
            Some(Anchor {
                href: href.to_string(),
                text: text.split_whitespace().collect::<Vec<_>>().join(" "),
            })
        })
        .collect()
}

/// Extract a page title, preferring `og:title` over the `<title>` tag.
///
/// A `<title>` value gets one trailing " | Brand"-style suffix stripped;
/// `og:title` is taken verbatim since sites set it per page.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Ok(selector) = Selector::parse(r#"meta[property="og:title"]"#) {
        if let Some(element) = document.select(&selector).next() {
            if let Some(content) = element.value().attr("content") {
                let title = content.trim();
                if !title.is_empty() {
                    return Some(title.to_string());
                }
            }
        }
    }

    let selector = Selector::parse("title").ok()?;
    let raw: String = document.select(&selector).next()?.text().collect();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(strip_brand_suffix(trimmed).to_string())
}

/// Drop a single trailing " | Brand" / " — Brand" style suffix.
fn strip_brand_suffix(title: &str) -> &str {
    for separator in [" | ", " — ", " – ", " - "] {
        if let Some(idx) = title.rfind(separator) {
            let head = title[..idx].trim();
            if !head.is_empty() {
                return head;
            }
        }
    }
    title
}
