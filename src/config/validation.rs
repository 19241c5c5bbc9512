use crate::config::types::{Config, ResolverConfig, SchedulerConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_resolver_config(&config.resolver)?;
    validate_scheduler_config(&config.scheduler)?;
    validate_user_agent_config(&config.user_agent)?;

    // The outer deadline must leave room for one URL with all of its retries
    let url_budget = config.resolver.max_url_budget_ms();
    if config.scheduler.invocation_timeout_ms <= url_budget {
        return Err(ConfigError::Validation(format!(
            "invocation_timeout_ms ({}) must be greater than the per-URL budget including retries ({}ms)",
            config.scheduler.invocation_timeout_ms, url_budget
        )));
    }

    Ok(())
}

/// Validates resolver configuration
fn validate_resolver_config(config: &ResolverConfig) -> Result<(), ConfigError> {
    if config.max_redirects < 1 || config.max_redirects > 50 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be between 1 and 50, got {}",
            config.max_redirects
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.url_timeout_ms < config.request_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "url_timeout_ms ({}) must be >= request_timeout_ms ({})",
            config.url_timeout_ms, config.request_timeout_ms
        )));
    }

    if config.max_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 5, got {}",
            config.max_retries
        )));
    }

    if config.default_scheme != "http" && config.default_scheme != "https" {
        return Err(ConfigError::Validation(format!(
            "default_scheme must be 'http' or 'https', got '{}'",
            config.default_scheme
        )));
    }

    Ok(())
}

/// Validates scheduler configuration
fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    if config.max_concurrent_batches < 1 || config.max_concurrent_batches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_batches must be between 1 and 100, got {}",
            config.max_concurrent_batches
        )));
    }

    if config.per_invocation_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "per_invocation_limit must be >= 1, got {}",
            config.per_invocation_limit
        )));
    }

    if config.progress_every < 1 {
        return Err(ConfigError::Validation(format!(
            "progress_every must be >= 1, got {}",
            config.progress_every
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Client name: non-empty, alphanumeric + hyphens only
    if config.client_name.is_empty() {
        return Err(ConfigError::Validation(
            "client_name cannot be empty".to_string(),
        ));
    }

    if !config
        .client_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "client_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.client_name
        )));
    }

    if config.client_version.is_empty() {
        return Err(ConfigError::Validation(
            "client_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}
