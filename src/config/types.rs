use serde::Deserialize;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Main configuration structure for Catalog-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(rename = "fan-out", default)]
    pub fan_out: FanOutConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub site: SiteConfig,
}

/// Retry and timeout behaviour for every page fetch
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Attempts per listing page, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the first retry (milliseconds); doubles per retry
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff sleep (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Extra random delay as a fraction of the backoff (0.0 - 1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,

    /// Per-attempt request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// TCP connect timeout (seconds)
    #[serde(
        rename = "connect-timeout-secs",
        default = "default_connect_timeout_secs"
    )]
    pub connect_timeout_secs: u64,
}

/// Detail-page enrichment behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct FanOutConfig {
    /// Maximum number of detail pages fetched at once per listing
    #[serde(
        rename = "max-concurrent-details",
        default = "default_max_concurrent_details"
    )]
    pub max_concurrent_details: usize,

    /// Attempts per detail page, including the first
    #[serde(
        rename = "detail-max-attempts",
        default = "default_detail_max_attempts"
    )]
    pub detail_max_attempts: u32,
}

/// User agent sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(default = "default_user_agent")]
    pub value: String,
}

/// Target site layout
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site root used when a query does not name one
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing path with `{category}` and `{page}` placeholders
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// Detail path with an `{id}` placeholder
    #[serde(rename = "detail-path", default = "default_detail_path")]
    pub detail_path: String,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

fn default_jitter() -> f64 {
    0.2
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_details() -> usize {
    8
}

fn default_detail_max_attempts() -> u32 {
    2
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_listing_path() -> String {
    "/vodtype/{category}-{page}.html".to_string()
}

fn default_detail_path() -> String {
    "/vodplay/id/{id}/sid/1/nid/1.html".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_concurrent_details: default_max_concurrent_details(),
            detail_max_attempts: default_detail_max_attempts(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: default_user_agent(),
        }
    }
}

impl SiteConfig {
    /// Creates a site config with the default path templates
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            listing_path: default_listing_path(),
            detail_path: default_detail_path(),
        }
    }
}

impl Config {
    /// Creates a config with default tuning for the given site root
    pub fn for_site(base_url: impl Into<String>) -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            fan_out: FanOutConfig::default(),
            user_agent: UserAgentConfig::default(),
            site: SiteConfig::with_base_url(base_url),
        }
    }
}
