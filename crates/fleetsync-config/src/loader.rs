//! Configuration loader.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::InvalidValue {
            field: "env pattern".to_string(),
            message: e.to_string(),
        })?;
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [api]
            base_url = "https://fleet.example.com/api"
            timeout_seconds = 10

            [realtime]
            ws_url = "wss://live.example.com"
            max_reconnect_attempts = 8
            base_delay_ms = 500

            [driver]
            report_interval_seconds = 15

            [admin]
            poll_interval_seconds = 30
            history_limit = 50

            [credentials]
            path = "/var/lib/fleetsync/creds.json"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.api.base_url, "https://fleet.example.com/api");
        assert_eq!(config.realtime.ws_url.as_deref(), Some("wss://live.example.com"));
        assert_eq!(config.realtime.max_reconnect_attempts, 8);
        assert_eq!(config.driver.report_interval_seconds, 15);
        assert_eq!(config.admin.history_limit, 50);
        assert_eq!(
            config.credentials.path.as_deref(),
            Some("/var/lib/fleetsync/creds.json")
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[admin]").unwrap();
        writeln!(file, "poll_interval_seconds = 20").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.admin.poll_interval_seconds, 20);
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let config = ConfigLoader::load_str(include_str!("../../../config/fleetsync.toml")).unwrap();
        assert!(crate::ConfigValidator::validate(&config).is_valid());
        assert_eq!(config.driver.report_interval_seconds, 5);
        assert_eq!(config.admin.poll_interval_seconds, 10);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/fleetsync.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ConfigLoader::load_or_default(Path::new("/nonexistent/fleetsync.toml")).unwrap();
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("FLEETSYNC_TEST_API_HOST", "fleet.internal");
        }
        let content = "[api]\nbase_url = \"https://${FLEETSYNC_TEST_API_HOST}/api\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.api.base_url, "https://fleet.internal/api");
        unsafe {
            std::env::remove_var("FLEETSYNC_TEST_API_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${FLEETSYNC_NONEXISTENT_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }

    #[test]
    fn test_expand_path_no_tilde() {
        let path = "/usr/local/share";
        assert_eq!(ConfigLoader::expand_path(path), path);
    }
}
