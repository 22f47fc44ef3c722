use crate::config::types::{Config, FetchConfig, PipelineConfig, ScheduleConfig, UserAgentConfig};
use crate::sites::SelectorSite;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pipeline_config(&config.pipeline)?;
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_schedule_config(&config.schedule)?;
    // Resolving the site checks its URLs and selectors
    SelectorSite::from_config(&config.site)?;
    Ok(())
}

/// Validates pipeline concurrency settings
pub fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    validate_fetch_limit(config.fetch_limit)?;
    validate_worker_count(config.worker_count)?;
    Ok(())
}

pub(crate) fn validate_fetch_limit(limit: usize) -> Result<(), ConfigError> {
    if !(1..=100).contains(&limit) {
        return Err(ConfigError::Validation(format!(
            "fetch_limit must be between 1 and 100, got {}",
            limit
        )));
    }
    Ok(())
}

pub(crate) fn validate_worker_count(count: usize) -> Result<(), ConfigError> {
    if !(1..=64).contains(&count) {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and 64, got {}",
            count
        )));
    }
    Ok(())
}

/// Validates fetch hardening limits
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.max_body_bytes == 0 {
        return Err(ConfigError::Validation(
            "max_body_bytes must be > 0".to_string(),
        ));
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

/// Validates the run scheduler timings
fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "interval_secs must be > 0".to_string(),
        ));
    }

    if config.initial_backoff_secs == 0 {
        return Err(ConfigError::Validation(
            "initial_backoff_secs must be > 0".to_string(),
        ));
    }

    if config.initial_backoff_secs > config.max_backoff_secs {
        return Err(ConfigError::Validation(format!(
            "initial_backoff_secs ({}) cannot exceed max_backoff_secs ({})",
            config.initial_backoff_secs, config.max_backoff_secs
        )));
    }

    Ok(())
}

/// Checks that a URL parses and uses an HTTP(S) scheme
pub(crate) fn validate_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(url)
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
