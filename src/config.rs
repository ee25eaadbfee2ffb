//! Configuration for linkscout

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::types::LinkType;

/// Main configuration for a linkscout node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory and persistence settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Shared HTTP client settings
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Sitemap parser settings
    #[serde(default)]
    pub sitemap: SitemapConfig,
    /// Navigation crawler settings
    #[serde(default)]
    pub navigation: NavigationConfig,
    /// Title fetcher settings
    #[serde(default)]
    pub titles: TitleConfig,
    /// Embedding service settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// URL skip and classification rules
    #[serde(default)]
    pub rules: LinkRules,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass rather than playing whack-a-mole.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.fetch.user_agent.trim().is_empty() {
            errors.push("fetch user_agent must not be empty".to_string());
        }
        if self.sitemap.root_timeout_secs == 0 {
            errors.push("sitemap root_timeout_secs must be positive".to_string());
        }
        if self.sitemap.child_timeout_secs == 0 {
            errors.push("sitemap child_timeout_secs must be positive".to_string());
        }
        if self.navigation.timeout_secs == 0 {
            errors.push("navigation timeout_secs must be positive".to_string());
        }
        if self.navigation.min_anchor_text_len == 0 {
            errors.push("navigation min_anchor_text_len must be positive".to_string());
        }
        if self.titles.timeout_secs == 0 {
            errors.push("titles timeout_secs must be positive".to_string());
        }
        if self.embedding.enabled {
            if self.embedding.endpoint.trim().is_empty() {
                errors.push("embedding endpoint must not be empty when enabled".to_string());
            } else if Url::parse(&self.embedding.endpoint).is_err() {
                errors.push(format!(
                    "embedding endpoint '{}' is not a valid URL",
                    self.embedding.endpoint
                ));
            }
            if self.embedding.dimensions == 0 {
                errors.push("embedding dimensions must be positive".to_string());
            }
            if self.embedding.dimensions > 4096 {
                errors.push("embedding dimensions must be <= 4096".to_string());
            }
        }
        if self.rules.product_patterns.is_empty()
            && self.rules.collection_patterns.is_empty()
            && self.rules.page_patterns.is_empty()
        {
            errors.push("rules must define at least one classification pattern".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Configuration errors:\n  - {}", errors.join("\n  - "))
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the sled database
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Shared HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "LinkscoutBot/1.0 (+https://github.com/linkscout)".to_string(),
            connect_timeout_secs: 10,
            max_redirects: 10,
        }
    }
}

/// Sitemap parser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    /// Timeout for the root sitemap fetch, seconds
    pub root_timeout_secs: u64,
    /// Timeout for each child sitemap fetch, seconds
    pub child_timeout_secs: u64,
}

impl SitemapConfig {
    pub fn root_timeout(&self) -> Duration {
        Duration::from_secs(self.root_timeout_secs)
    }

    pub fn child_timeout(&self) -> Duration {
        Duration::from_secs(self.child_timeout_secs)
    }
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            root_timeout_secs: 30,
            child_timeout_secs: 10,
        }
    }
}

/// Navigation crawler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Timeout for the homepage fetch, seconds
    pub timeout_secs: u64,
    /// Minimum visible anchor text length to consider a link navigational
    pub min_anchor_text_len: usize,
}

impl NavigationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            min_anchor_text_len: 2,
        }
    }
}

/// Title fetcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleConfig {
    /// Per-page fetch timeout, seconds
    pub timeout_secs: u64,
}

impl TitleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self { timeout_secs: 8 }
    }
}

fn default_embed_timeout() -> u64 {
    30
}

/// Embedding service settings (OpenAI-compatible HTTP endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Whether to call the embedding service at all
    pub enabled: bool,
    /// API endpoint URL (e.g., "https://api.openai.com/v1/embeddings")
    pub endpoint: String,
    /// API key (optional, can also use OPENAI_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name (e.g., "text-embedding-3-small")
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Request timeout in seconds
    #[serde(default = "default_embed_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: default_embed_timeout(),
        }
    }
}

/// URL skip and classification rules.
///
/// Passed into the crawler and merger rather than hardcoded so brands with
/// different URL schemes can override them per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRules {
    /// Path substrings that disqualify a URL entirely
    pub skip_patterns: Vec<String>,
    /// Path substrings classifying a URL as a product
    pub product_patterns: Vec<String>,
    /// Path substrings classifying a URL as a collection
    pub collection_patterns: Vec<String>,
    /// Path substrings classifying a URL as a content page
    pub page_patterns: Vec<String>,
}

impl LinkRules {
    /// Whether a URL matches the skip list and should be discarded.
    pub fn should_skip(&self, url: &Url) -> bool {
        let path = url.path().to_ascii_lowercase();
        self.skip_patterns.iter().any(|p| path.contains(p.as_str()))
    }

    /// Classify a URL path; `None` means uncategorized and discarded.
    pub fn classify(&self, path: &str) -> Option<LinkType> {
        let path = path.to_ascii_lowercase();
        if self.product_patterns.iter().any(|p| path.contains(p.as_str())) {
            return Some(LinkType::Product);
        }
        if self.collection_patterns.iter().any(|p| path.contains(p.as_str())) {
            return Some(LinkType::Collection);
        }
        if self.page_patterns.iter().any(|p| path.contains(p.as_str())) {
            return Some(LinkType::Page);
        }
        None
    }
}

impl Default for LinkRules {
    fn default() -> Self {
        Self {
            skip_patterns: [
                "/cart",
                "/checkout",
                "/account",
                "/login",
                "/register",
                "/admin",
                "/search",
                "/api/",
                "/cdn/",
                "/wishlist",
                "/compare",
                "/password",
                "/challenge",
                "/policies/",
                "/gift_card",
                "/orders",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            product_patterns: vec!["/products/".to_string()],
            collection_patterns: vec!["/collections/".to_string()],
            page_patterns: vec!["/pages/".to_string()],
        }
    }
}
