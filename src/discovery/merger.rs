//! URL merger and deduplicator
//!
//! Combines sitemap URLs and navigation-crawl candidates into one candidate
//! set under a fixed priority rule: sitemap wins on source attribution,
//! navigation can only fill title gaps.

use std::collections::HashMap;

use tracing::debug;
use url::Url;

use crate::config::LinkRules;
use crate::types::{LinkCandidate, LinkSource};

/// Merge sitemap URLs with navigation candidates.
///
/// Sitemap URLs pass through the same skip list and classification as the
/// navigation crawl; uncategorized ones are dropped. When a URL appears in
/// both datasets the entry keeps `source = sitemap`, and a missing title is
/// backfilled from the navigation anchor text.
pub fn merge_candidates(
    sitemap_urls: Vec<String>,
    nav_candidates: Vec<LinkCandidate>,
    rules: &LinkRules,
) -> Vec<LinkCandidate> {
    let mut by_url: HashMap<String, LinkCandidate> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    let mut dropped = 0usize;
    for raw in sitemap_urls {
        let Some(candidate) = classify_sitemap_url(&raw, rules) else {
            dropped += 1;
            continue;
        };
        if !by_url.contains_key(&candidate.url) {
            order.push(candidate.url.clone());
            by_url.insert(candidate.url.clone(), candidate);
        }
    }
    debug!(
        "sitemap pass kept {} candidates, dropped {} skip-listed or uncategorized",
        order.len(),
        dropped
    );

    for nav in nav_candidates {
        match by_url.get_mut(&nav.url) {
            Some(existing) => {
                // Backfill only; the sitemap keeps source attribution.
                if existing.title.is_none() {
                    existing.title = nav.title;
                }
            }
            None => {
                order.push(nav.url.clone());
                by_url.insert(nav.url.clone(), nav);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|url| by_url.remove(&url))
        .collect()
}

/// Classify one sitemap URL; `None` drops it (invalid, skip-listed, or
/// uncategorized).
fn classify_sitemap_url(raw: &str, rules: &LinkRules) -> Option<LinkCandidate> {
    let mut url = Url::parse(raw.trim()).ok()?;
    url.set_fragment(None);
    if rules.should_skip(&url) {
        return None;
    }
    let link_type = rules.classify(url.path())?;
    Some(LinkCandidate {
        url: String::from(url),
        link_type,
        title: None,
        source: LinkSource::Sitemap,
    })
}
