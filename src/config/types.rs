use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Tag-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub site: SiteConfig,
}

/// Concurrency settings for a pipeline run
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of simultaneous network fetches
    #[serde(rename = "fetch-limit", default = "default_fetch_limit")]
    pub fetch_limit: usize,

    /// Number of extraction worker threads
    #[serde(rename = "worker-count", default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_limit: default_fetch_limit(),
            worker_count: default_worker_count(),
        }
    }
}

/// Per-fetch hardening limits
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Deadline for a whole request, body included (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Deadline for establishing a connection (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Largest response body accepted
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Repeated-run scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Sleep between successful runs (seconds)
    #[serde(rename = "interval-secs", default = "default_interval")]
    pub interval_secs: u64,

    /// First delay after a run where every fetch failed (seconds)
    #[serde(rename = "initial-backoff-secs", default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,

    /// Upper bound for the failure backoff (seconds)
    #[serde(rename = "max-backoff-secs", default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            initial_backoff_secs: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

/// Target site description
///
/// Either names a built-in `preset` (optionally overriding some of its
/// fields) or spells out every selector.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    pub preset: Option<String>,
    pub name: Option<String>,
    pub base_url: Option<String>,
    /// Listing page URL containing a `{page}` placeholder
    pub listing_template: Option<String>,
    /// Listing pages 1..=max_page are seeded
    pub max_page: Option<u32>,
    pub link_selector: Option<String>,
    pub title_selector: Option<String>,
    pub timestamp_selector: Option<String>,
    pub timestamp_attr: Option<String>,
    pub body_selector: Option<String>,
    pub body_separator: Option<String>,
}

fn default_fetch_limit() -> usize {
    10
}

fn default_worker_count() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_interval() -> u64 {
    60 * 60
}

fn default_initial_backoff() -> u64 {
    30
}

fn default_max_backoff() -> u64 {
    30 * 60
}
