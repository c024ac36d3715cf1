use crate::config::types::{Config, FanOutConfig, FetcherConfig, SiteConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_fan_out_config(&config.fan_out)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_site_config(&config.site)?;
    Ok(())
}

/// Validates fetcher retry and timeout settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    validate_attempts("max_attempts", config.max_attempts)?;

    if config.max_delay_ms < config.base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max_delay_ms ({}) must be >= base_delay_ms ({})",
            config.max_delay_ms, config.base_delay_ms
        )));
    }

    if !(0.0..=1.0).contains(&config.jitter) {
        return Err(ConfigError::Validation(format!(
            "jitter must be between 0.0 and 1.0, got {}",
            config.jitter
        )));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 1 and 120, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates detail enrichment settings
fn validate_fan_out_config(config: &FanOutConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_details < 1 || config.max_concurrent_details > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_details must be between 1 and 64, got {}",
            config.max_concurrent_details
        )));
    }

    validate_attempts("detail_max_attempts", config.detail_max_attempts)
}

fn validate_attempts(name: &str, attempts: u32) -> Result<(), ConfigError> {
    if attempts < 1 || attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and 10, got {}",
            name, attempts
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user agent value cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the site root and path templates
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    validate_template(&config.listing_path, &["{category}", "{page}"])?;
    validate_template(&config.detail_path, &["{id}"])?;

    Ok(())
}

/// Checks that a path template is absolute and names every placeholder
fn validate_template(template: &str, placeholders: &[&str]) -> Result<(), ConfigError> {
    if !template.starts_with('/') {
        return Err(ConfigError::InvalidTemplate(format!(
            "'{}' must start with '/'",
            template
        )));
    }

    for placeholder in placeholders {
        if !template.contains(placeholder) {
            return Err(ConfigError::InvalidTemplate(format!(
                "'{}' is missing the {} placeholder",
                template, placeholder
            )));
        }
    }

    Ok(())
}
