//! Navigation crawler
//!
//! Fetches a brand's homepage once and turns its anchor elements into
//! classified link candidates. The homepage being unreachable is non-fatal:
//! the sitemap remains the primary discovery source.

use std::collections::HashSet;

use tracing::{info, warn};
use url::Url;

use crate::config::{LinkRules, NavigationConfig};
use crate::types::{LinkCandidate, LinkSource};

use super::extract::extract_anchors;
use super::fetcher::HtmlFetcher;

/// Navigation crawler bound to a fetcher, timeouts, and link rules
pub struct NavCrawler<'a, F> {
    fetcher: &'a F,
    config: &'a NavigationConfig,
    rules: &'a LinkRules,
}

impl<'a, F: HtmlFetcher> NavCrawler<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a NavigationConfig, rules: &'a LinkRules) -> Self {
        Self {
            fetcher,
            config,
            rules,
        }
    }

    /// Crawl `https://{domain}` and return classified candidates.
    ///
    /// Any failure here yields an empty list; navigation links only ever
    /// supplement the sitemap.
    pub async fn crawl(&self, domain: &str) -> Vec<LinkCandidate> {
        let base = match Url::parse(&format!("https://{}/", domain.trim_end_matches('/'))) {
            Ok(u) => u,
            Err(e) => {
                warn!("invalid brand domain '{}': {}", domain, e);
                return Vec::new();
            }
        };

        let html = match self.fetcher.fetch_text(&base, self.config.timeout()).await {
            Ok(body) => body,
            Err(e) => {
                warn!("homepage fetch failed for {}: {}", domain, e);
                return Vec::new();
            }
        };

        let candidates =
            classify_anchors(&html, &base, self.rules, self.config.min_anchor_text_len);
        info!(
            "navigation crawl of {} found {} categorized links",
            domain,
            candidates.len()
        );
        candidates
    }
}

/// Turn raw homepage anchors into deduplicated, classified candidates.
///
/// Filters, in order: visible text length, non-navigational schemes and
/// fragments, unresolvable hrefs, cross-domain targets, the skip list, and
/// unclassifiable paths. First occurrence of a URL wins.
pub fn classify_anchors(
    html: &str,
    base: &Url,
    rules: &LinkRules,
    min_text_len: usize,
) -> Vec<LinkCandidate> {
    let base_host = normalized_host(base);
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for anchor in extract_anchors(html) {
        let text = anchor.text.trim();
        if text.chars().count() < min_text_len {
            continue;
        }

        let href = anchor.href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        let mut url = match base.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };
        url.set_fragment(None);

        if normalized_host(&url) != base_host {
            continue;
        }
        if rules.should_skip(&url) {
            continue;
        }
        let Some(link_type) = rules.classify(url.path()) else {
            continue;
        };

        let url_string = String::from(url);
        if seen.insert(url_string.clone()) {
            candidates.push(LinkCandidate {
                url: url_string,
                link_type,
                title: Some(text.to_string()),
                source: LinkSource::Navigation,
            });
        }
    }

    candidates
}

/// Host with a leading `www.` stripped so `www.shop.com` and `shop.com` match.
fn normalized_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LinkType;

    fn base() -> Url {
        Url::parse("https://shop.example.com/").unwrap()
    }

    #[test]
    fn classifies_and_resolves_relative_links() {
        let html = r#"
            <a href="/products/cap">Baseball Cap</a>
            <a href="/collections/hats">Hats</a>
            <a href="https://shop.example.com/pages/about">About Us</a>
        "#;
        let rules = LinkRules::default();
        let candidates = classify_anchors(html, &base(), &rules, 2);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].url, "https://shop.example.com/products/cap");
        assert_eq!(candidates[0].link_type, LinkType::Product);
        assert_eq!(candidates[0].title.as_deref(), Some("Baseball Cap"));
        assert_eq!(candidates[0].source, LinkSource::Navigation);
        assert_eq!(candidates[1].link_type, LinkType::Collection);
        assert_eq!(candidates[2].link_type, LinkType::Page);
    }

    #[test]
    fn discards_non_navigational_and_short_text_links() {
        let html = r##"
            <a href="#menu">Open menu</a>
            <a href="javascript:void(0)">Click here</a>
            <a href="mailto:hi@example.com">Email sales team</a>
            <a href="tel:+1234567890">Call our store</a>
            <a href="/products/x">x</a>
            <a href="/products/cap"></a>
        "##;
        let rules = LinkRules::default();
        assert!(classify_anchors(html, &base(), &rules, 2).is_empty());
    }

    #[test]
    fn discards_cross_domain_skip_listed_and_uncategorized() {
        let html = r#"
            <a href="https://other.example.net/products/cap">Their Cap</a>
            <a href="/cart">View Cart</a>
            <a href="/blog/news">Our Blog</a>
            <a href="https://www.shop.example.com/products/cap">Our Cap</a>
        "#;
        let rules = LinkRules::default();
        let candidates = classify_anchors(html, &base(), &rules, 2);

        // www-prefixed same-domain link survives, everything else is dropped.
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title.as_deref(), Some("Our Cap"));
    }

    #[test]
    fn deduplicates_keeping_first_occurrence() {
        let html = r#"
            <a href="/products/cap">First Label</a>
            <a href="/products/cap">Second Label</a>
            <a href="/products/cap#reviews">Third Label</a>
        "#;
        let rules = LinkRules::default();
        let candidates = classify_anchors(html, &base(), &rules, 2);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title.as_deref(), Some("First Label"));
    }
}
