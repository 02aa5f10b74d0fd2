use serde::Deserialize;

/// Main configuration structure for cep-harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Root listing page; every container link must live under its path
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Exact number of postal codes to collect
    pub target: usize,

    /// Worker pool size (1 = sequential breadth-first crawl)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay after each completed page (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Lower bound for the per-completion delay in parallel mode (milliseconds)
    #[serde(
        rename = "min-parallel-delay-ms",
        default = "default_min_parallel_delay_ms"
    )]
    pub min_parallel_delay_ms: u64,

    /// Required leading digits for admitted codes, e.g. "0"
    #[serde(rename = "region-prefix", default)]
    pub region_prefix: Option<String>,
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
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV handoff file
    #[serde(rename = "csv-path")]
    pub csv_path: String,
}

/// Link classification heuristics
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Path segments naming non-content sections
    #[serde(rename = "excluded-sections", default = "default_excluded_sections")]
    pub excluded_sections: Vec<String>,

    /// Path segments naming record-detail pages
    #[serde(rename = "record-segments", default = "default_record_segments")]
    pub record_segments: Vec<String>,

    /// Segments that never name a sub-region when they follow the base path
    #[serde(
        rename = "placeholder-segments",
        default = "default_placeholder_segments"
    )]
    pub placeholder_segments: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            excluded_sections: default_excluded_sections(),
            record_segments: default_record_segments(),
            placeholder_segments: default_placeholder_segments(),
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    2000
}

fn default_min_parallel_delay_ms() -> u64 {
    500
}

fn default_excluded_sections() -> Vec<String> {
    ["blog", "sobre", "contato", "meu-cep"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_record_segments() -> Vec<String> {
    vec!["cep".to_string(), "logradouro".to_string()]
}

fn default_placeholder_segments() -> Vec<String> {
    vec!["sp".to_string()]
}
