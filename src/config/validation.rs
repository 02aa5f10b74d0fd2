use crate::config::types::{ClassifierConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Largest worker pool accepted; the target is a single site
const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_classifier_config(&config.classifier)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", config.base_url, e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    if base.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    if config.target < 1 {
        return Err(ConfigError::Validation(
            "target must be >= 1".to_string(),
        ));
    }

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if let Some(prefix) = &config.region_prefix {
        if prefix.is_empty() || prefix.len() > 5 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Validation(format!(
                "region-prefix must be 1 to 5 digits, got '{}'",
                prefix
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "csv-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates classifier segment lists
fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    let lists = [
        ("excluded-sections", &config.excluded_sections),
        ("record-segments", &config.record_segments),
        ("placeholder-segments", &config.placeholder_segments),
    ];

    for (name, segments) in lists {
        for segment in segments {
            if segment.is_empty() || segment.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "{} entries must be single non-empty path segments, got '{}'",
                    name, segment
                )));
            }
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler_config() -> CrawlerConfig {
        CrawlerConfig {
            base_url: "https://example.com/pt-br/brasil/sp/sao-paulo/".to_string(),
            target: 100,
            workers: 3,
            timeout_secs: 30,
            request_delay_ms: 2000,
            min_parallel_delay_ms: 500,
            region_prefix: Some("0".to_string()),
        }
    }

    #[test]
    fn test_valid_crawler_config() {
        assert!(validate_crawler_config(&crawler_config()).is_ok());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = crawler_config();
        config.base_url = "not a url".to_string();
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));

        config.base_url = "ftp://example.com/".to_string();
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_zero_target() {
        let mut config = crawler_config();
        config.target = 0;
        assert!(validate_crawler_config(&config).is_err());
    }

    #[test]
    fn test_worker_bounds() {
        let mut config = crawler_config();
        config.workers = 0;
        assert!(validate_crawler_config(&config).is_err());
        config.workers = MAX_WORKERS + 1;
        assert!(validate_crawler_config(&config).is_err());
        config.workers = MAX_WORKERS;
        assert!(validate_crawler_config(&config).is_ok());
    }

    #[test]
    fn test_region_prefix_must_be_digits() {
        let mut config = crawler_config();
        config.region_prefix = Some("a".to_string());
        assert!(validate_crawler_config(&config).is_err());
        config.region_prefix = Some(String::new());
        assert!(validate_crawler_config(&config).is_err());
        config.region_prefix = Some("013".to_string());
        assert!(validate_crawler_config(&config).is_ok());
        config.region_prefix = None;
        assert!(validate_crawler_config(&config).is_ok());
    }

    #[test]
    fn test_classifier_segments_must_be_single() {
        let mut config = ClassifierConfig::default();
        assert!(validate_classifier_config(&config).is_ok());
        config.record_segments.push("a/b".to_string());
        assert!(validate_classifier_config(&config).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
