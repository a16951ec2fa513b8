//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (interval > 0, addresses parse)
//! - Detect duplicate or empty admin credentials
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PanelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::PanelConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("scheduler.restart_interval_secs must be greater than zero")]
    ZeroRestartInterval,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("admin user {0} has an empty api_key")]
    EmptyApiKey(i64),

    #[error("admin user {0} must have a positive owner_id")]
    InvalidOwner(i64),

    #[error("api_key for owner {0} is used more than once")]
    DuplicateApiKey(i64),

    #[error("engine.config_path must not be empty")]
    EmptyEngineConfigPath,
}

/// Check a parsed config, collecting every problem found.
pub fn validate_config(config: &PanelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.scheduler.restart_interval_secs == 0 {
        errors.push(ValidationError::ZeroRestartInterval);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.engine.config_path.trim().is_empty() {
        errors.push(ValidationError::EmptyEngineConfigPath);
    }

    let mut seen = HashSet::new();
    for user in &config.admin.users {
        if user.owner_id <= 0 {
            errors.push(ValidationError::InvalidOwner(user.owner_id));
        }
        if user.api_key.is_empty() {
            errors.push(ValidationError::EmptyApiKey(user.owner_id));
        } else if !seen.insert(user.api_key.as_str()) {
            errors.push(ValidationError::DuplicateApiKey(user.owner_id));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::AdminUser;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&PanelConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = PanelConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.scheduler.restart_interval_secs = 0;
        config.admin.users = vec![
            AdminUser { owner_id: 1, api_key: "k".into() },
            AdminUser { owner_id: 2, api_key: "k".into() },
            AdminUser { owner_id: 0, api_key: String::new() },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::BindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::ZeroRestartInterval));
        assert!(errors.contains(&ValidationError::DuplicateApiKey(2)));
        assert!(errors.contains(&ValidationError::InvalidOwner(0)));
        assert!(errors.contains(&ValidationError::EmptyApiKey(0)));
    }
}
