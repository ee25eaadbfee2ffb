//! Sitemap fetching and parsing
//!
//! Resolves a brand's sitemap URL into a flat list of page URLs. A sitemap
//! index is expanded one level deep, capped at the first
//! [`MAX_CHILD_SITEMAPS`] children; a failed child fetch is skipped rather
//! than failing the run, and malformed XML degrades to an empty list for
//! that document.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, warn};
use url::Url;

use crate::config::SitemapConfig;

use super::fetcher::{FetchError, HtmlFetcher};

/// Hard cap on child sitemaps expanded from a sitemap index.
///
/// Anything past the first 10 children is deliberately truncated.
pub const MAX_CHILD_SITEMAPS: usize = 10;

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: child sitemap locations
    Index(Vec<String>),
    /// `<urlset>`: page locations
    UrlSet(Vec<String>),
}

/// Parse one sitemap XML document.
///
/// Malformed XML stops parsing at the error and returns whatever was
/// collected so far, so a truncated document still yields partial results.
pub fn parse_document(xml: &str) -> SitemapDocument {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut is_index = false;
    let mut saw_root = false;
    let mut stack: Vec<String> = Vec::new();
    let mut locations: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                if !saw_root {
                    saw_root = true;
                    is_index = name == "sitemapindex";
                }
                stack.push(name);
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(e)) => {
                if let Ok(text) = e.unescape() {
                    push_location(&stack, is_index, text.trim(), &mut locations);
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).to_string();
                push_location(&stack, is_index, text.trim(), &mut locations);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("sitemap XML parse stopped early: {}", e);
                break;
            }
        }
    }

    if is_index {
        SitemapDocument::Index(locations)
    } else {
        SitemapDocument::UrlSet(locations)
    }
}

/// Record a `<loc>` value if it sits inside the expected container element.
fn push_location(stack: &[String], is_index: bool, loc: &str, out: &mut Vec<String>) {
    if loc.is_empty() || stack.last().map(String::as_str) != Some("loc") {
        return;
    }
    let container = stack.iter().rev().nth(1).map(String::as_str);
    let wanted = if is_index { "sitemap" } else { "url" };
    if container == Some(wanted) {
        out.push(loc.to_string());
    }
}

/// Sitemap parser bound to a fetcher and timeouts
pub struct SitemapParser<'a, F> {
    fetcher: &'a F,
    config: &'a SitemapConfig,
}

impl<'a, F: HtmlFetcher> SitemapParser<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a SitemapConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch the root sitemap and flatten it into page URLs.
    ///
    /// A root fetch failure is fatal and propagates; child failures are
    /// skipped. Child documents that are themselves indexes are not expanded
    /// further.
    pub async fn collect(&self, sitemap_url: &str) -> Result<Vec<String>, FetchError> {
        let root_url =
            Url::parse(sitemap_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let xml = self
            .fetcher
            .fetch_text(&root_url, self.config.root_timeout())
            .await?;

        match parse_document(&xml) {
            SitemapDocument::UrlSet(urls) => Ok(urls),
            SitemapDocument::Index(children) => {
                if children.len() > MAX_CHILD_SITEMAPS {
                    warn!(
                        "sitemap index at {} has {} children, truncating to first {}",
                        sitemap_url,
                        children.len(),
                        MAX_CHILD_SITEMAPS
                    );
                }

                let mut urls = Vec::new();
                for child in children.into_iter().take(MAX_CHILD_SITEMAPS) {
                    let child_url = match Url::parse(&child) {
                        Ok(u) => u,
                        Err(e) => {
                            warn!("skipping invalid child sitemap location '{}': {}", child, e);
                            continue;
                        }
                    };

                    match self
                        .fetcher
                        .fetch_text(&child_url, self.config.child_timeout())
                        .await
                    {
                        Ok(xml) => match parse_document(&xml) {
                            SitemapDocument::UrlSet(u) => {
                                debug!("child sitemap {} yielded {} URLs", child, u.len());
                                urls.extend(u);
                            }
                            SitemapDocument::Index(_) => {
                                debug!("nested sitemap index at {} not expanded", child);
                            }
                        },
                        Err(e) => warn!("skipping unreachable child sitemap {}: {}", child, e),
                    }
                }
                Ok(urls)
            }
        }
    }
}
