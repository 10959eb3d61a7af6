use crate::config::types::{
    Config, DiscoveryConfig, HarvestConfig, OutputConfig, SessionConfig, SourceEntry,
    UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Upper bound on concurrent fetches; the target site's tolerance binds, not throughput
const MAX_WORKERS: usize = 4;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    if let Some(session) = &config.session {
        validate_session_config(session)?;
    }
    validate_discovery_config(&config.discovery)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates orchestration settings
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.save_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "save_interval must be >= 1, got {}",
            config.save_interval
        )));
    }

    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_multiplier must be a finite number >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.min_content_length < 1 {
        return Err(ConfigError::Validation(
            "min_content_length must be >= 1".to_string(),
        ));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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
    if config.index_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("index_dir cannot be empty".to_string()));
    }

    if config.archive_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "archive_dir cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("url_list_file", &config.url_list_file),
        ("progress_file", &config.progress_file),
        ("capture_log_file", &config.capture_log_file),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates the session probe
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    validate_http_url("probe_url", &config.probe_url)?;
    validate_selector("marker_selector", &config.marker_selector)?;
    Ok(())
}

/// Validates discovery settings
fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if config.article_hosts.is_empty() {
        return Err(ConfigError::Validation(
            "article_hosts must list at least one host".to_string(),
        ));
    }

    for host in &config.article_hosts {
        validate_domain_pattern(host)?;
    }

    if config.article_prefixes.is_empty() {
        return Err(ConfigError::Validation(
            "article_prefixes must list at least one path prefix".to_string(),
        ));
    }

    for prefix in &config.article_prefixes {
        if !prefix.starts_with('/') || prefix.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "Article prefix '{}' must start with '/' and name a path",
                prefix
            )));
        }
    }

    validate_selector("next_selector", &config.next_selector)?;

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates index sources
fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[source]] must be configured".to_string(),
        ));
    }

    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Source '{}' must have a name",
                source.url
            )));
        }
        validate_http_url("source url", &source.url)?;
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use HTTP or HTTPS",
            field, value
        )));
    }

    Ok(())
}

fn validate_selector(field: &str, value: &str) -> Result<(), ConfigError> {
    Selector::parse(value).map_err(|e| {
        ConfigError::Validation(format!("Invalid CSS selector for {}: {:?}", field, e))
    })?;
    Ok(())
}

/// Validates a host pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Validation(format!("Invalid email format: '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }

    Ok(())
}
