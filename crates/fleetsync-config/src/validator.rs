//! Configuration validation.

use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a [`ConfigError`], if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_api(config, &mut result);
        Self::validate_realtime(config, &mut result);
        Self::validate_refresh(config, &mut result);

        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        }

        result
    }

    fn validate_api(config: &Config, result: &mut ValidationResult) {
        match Url::parse(&config.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.scheme() == "http" && url.host_str() != Some("localhost") {
                    result.add_warning(ValidationWarning::new(
                        "api.base_url",
                        "Plain http to a remote host sends bearer tokens unencrypted",
                    ));
                }
            }
            Ok(_) => result.add_error(ValidationError::new(
                "api.base_url",
                "base_url must start with http:// or https://",
            )),
            Err(e) => result.add_error(ValidationError::new(
                "api.base_url",
                format!("Invalid URL: {}", e),
            )),
        }

        if config.api.timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "api.timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        }
    }

    fn validate_realtime(config: &Config, result: &mut ValidationResult) {
        let realtime = &config.realtime;

        if let Some(ref ws_url) = realtime.ws_url {
            match Url::parse(ws_url) {
                Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
                Ok(_) => result.add_error(ValidationError::new(
                    "realtime.ws_url",
                    "ws_url must start with ws:// or wss://",
                )),
                Err(e) => result.add_error(ValidationError::new(
                    "realtime.ws_url",
                    format!("Invalid URL: {}", e),
                )),
            }
        }

        if realtime.base_delay_ms == 0 {
            result.add_error(ValidationError::new(
                "realtime.base_delay_ms",
                "base_delay_ms must be greater than 0",
            ));
        }

        if realtime.connect_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "realtime.connect_timeout_ms",
                "connect_timeout_ms must be greater than 0",
            ));
        }

        if realtime.max_reconnect_attempts == 0 {
            result.add_warning(ValidationWarning::new(
                "realtime.max_reconnect_attempts",
                "Live channel will not retry after the first disconnect",
            ));
        }

        // 2^16 seconds is already more than 18 hours.
        if realtime.max_reconnect_attempts > 16 {
            result.add_warning(ValidationWarning::new(
                "realtime.max_reconnect_attempts",
                "Backoff delays beyond 16 attempts exceed many hours",
            ));
        }
    }

    fn validate_refresh(config: &Config, result: &mut ValidationResult) {
        if config.driver.report_interval_seconds == 0 {
            result.add_error(ValidationError::new(
                "driver.report_interval_seconds",
                "report_interval_seconds must be greater than 0",
            ));
        }

        if config.admin.poll_interval_seconds == 0 {
            result.add_error(ValidationError::new(
                "admin.poll_interval_seconds",
                "poll_interval_seconds must be greater than 0",
            ));
        }

        for (path, limit) in [
            ("driver.history_limit", config.driver.history_limit),
            ("admin.history_limit", config.admin.history_limit),
        ] {
            if limit == 0 {
                result.add_warning(ValidationWarning::new(
                    path,
                    "history_limit of 0 hides all location history",
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
