//! Configuration validation

use crate::{AppConfig, ConfigError, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    if let Err(e) = validate_log_level(&config.service.log_level) {
        errors.push(e);
    }

    if config.reservation.ttl_secs == 0 {
        errors.push(ValidationError::new(
            "reservation.ttl_secs",
            "must be greater than 0",
        ));
    }

    if config.reservation.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "reservation.sweep_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.reservation.sweep_interval_secs > config.reservation.ttl_secs {
        errors.push(ValidationError::new(
            "reservation.sweep_interval_secs",
            "must not exceed reservation.ttl_secs",
        ));
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.window_secs",
            "must be greater than 0",
        ));
    }

    if config.rate_limit.default_ceiling == 0 {
        errors.push(ValidationError::new(
            "rate_limit.default_ceiling",
            "must be greater than 0",
        ));
    }

    for (client, ceiling) in &config.rate_limit.client_ceilings {
        if *ceiling == 0 {
            errors.push(ValidationError::new(
                format!("rate_limit.client_ceilings.{client}"),
                "must be greater than 0",
            ));
        }
    }

    if config.inventory.cache_ttl_secs == 0 {
        errors.push(ValidationError::new(
            "inventory.cache_ttl_secs",
            "must be greater than 0",
        ));
    }

    if config.session.idle_ttl_secs == 0 {
        errors.push(ValidationError::new(
            "session.idle_ttl_secs",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        let combined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::ValidationError(combined))
    }
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "service.log_level",
            format!("unknown log level: {level}"),
        )),
    }
}
