//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::{ConcurrencyMode, ProtocolMode};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                println!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            println!("No {} file found, using defaults and environment", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Packet Loss Tester Configuration
#
# Every setting is optional. Values exported in the shell take precedence
# over the ones in this file.

# Device under test (bare host or IP)
# TARGET_ADDRESS=192.168.1.1

# Target port (defaults to 80 for http, 5000 for tcp/udp)
# TARGET_PORT=80

# Number of attempts per run
# NUM_TESTS=200

# Per-attempt timeout in seconds
# TIMEOUT_SECONDS=2.0

# Pause between attempts in seconds
# DELAY_SECONDS=0

# Protocol: http, tcp or udp
# PROTOCOL_MODE=http

# Scheduling: sync or async
# CONCURRENCY_MODE=sync

# Probe the port before each attempt
# DYNAMIC_PORT_CHECK=false
# PORT_CHECK_TIMEOUT_SECONDS=1.0

# HTTP retry budget and exponential backoff base (seconds)
# MAX_RETRIES=3
# BACKOFF_FACTOR=0.3

# Raw TCP / UDP payload size in bytes
# PAYLOAD_SIZE=64

# HTTP request path
# HTTP_PATH=/

# Label recorded with the run (cable, radio, ...)
# CONNECTION_TYPE=cat6

# Write the JSON run report here
# REPORT_PATH=results/run.json

# Output
# ENABLE_COLOR=true
# VERBOSE=false
# DEBUG=false

# Example: UDP echo bench against a local echo server
# TARGET_ADDRESS=127.0.0.1
# PROTOCOL_MODE=udp
# CONCURRENCY_MODE=async
# NUM_TESTS=500
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "TARGET_ADDRESS" => {
                if value.is_empty() || value.contains("://") {
                    return Err(AppError::config(format!(
                        "TARGET_ADDRESS must be a bare host or IP, got: '{}'",
                        value
                    )));
                }
            }
            "TARGET_PORT" => {
                let port: u16 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid TARGET_PORT value '{}': {}", value, e)))?;
                if port == 0 {
                    return Err(AppError::config("TARGET_PORT must be between 1 and 65535"));
                }
            }
            "NUM_TESTS" => {
                let count: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid NUM_TESTS value '{}': {}", value, e)))?;
                if count == 0 || count > crate::defaults::MAX_NUM_TESTS {
                    return Err(AppError::config(format!(
                        "NUM_TESTS must be between 1 and {}, got: {}",
                        crate::defaults::MAX_NUM_TESTS,
                        count
                    )));
                }
            }
            "TIMEOUT_SECONDS" | "PORT_CHECK_TIMEOUT_SECONDS" => {
                let timeout: f64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !(timeout > 0.0 && timeout <= 300.0) {
                    return Err(AppError::config(format!("{} must be in (0, 300], got: {}", key, timeout)));
                }
            }
            "DELAY_SECONDS" | "BACKOFF_FACTOR" => {
                let seconds: f64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(AppError::config(format!("{} cannot be negative, got: {}", key, seconds)));
                }
            }
            "PROTOCOL_MODE" => {
                value.parse::<ProtocolMode>()?;
            }
            "CONCURRENCY_MODE" => {
                value.parse::<ConcurrencyMode>()?;
            }
            "MAX_RETRIES" => {
                let retries: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid MAX_RETRIES value '{}': {}", value, e)))?;
                if retries > 10 {
                    return Err(AppError::config(format!("MAX_RETRIES must be at most 10, got: {}", retries)));
                }
            }
            "PAYLOAD_SIZE" => {
                let size: usize = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid PAYLOAD_SIZE value '{}': {}", value, e)))?;
                if size == 0 {
                    return Err(AppError::config("PAYLOAD_SIZE must be greater than 0"));
                }
            }
            "HTTP_PATH" => {
                if !value.starts_with('/') {
                    return Err(AppError::config(format!("HTTP_PATH must start with '/', got: '{}'", value)));
                }
            }
            "DYNAMIC_PORT_CHECK" | "ENABLE_COLOR" | "VERBOSE" | "DEBUG" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {
                // Free-form or unknown variable
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("TARGET_ADDRESS", "Host or IP of the device under test", "192.168.1.1"),
            ("TARGET_PORT", "Target port (protocol default when unset)", "80"),
            ("NUM_TESTS", "Number of attempts per run", "200"),
            ("TIMEOUT_SECONDS", "Per-attempt timeout in seconds", "2.0"),
            ("DELAY_SECONDS", "Pause between attempts in seconds", "0.1"),
            ("PROTOCOL_MODE", "http, tcp or udp", "udp"),
            ("CONCURRENCY_MODE", "sync or async", "async"),
            ("DYNAMIC_PORT_CHECK", "Probe the port before each attempt", "true"),
            ("PORT_CHECK_TIMEOUT_SECONDS", "Port probe timeout in seconds", "1.0"),
            ("MAX_RETRIES", "HTTP retry budget (0-10)", "3"),
            ("BACKOFF_FACTOR", "HTTP backoff base in seconds", "0.3"),
            ("PAYLOAD_SIZE", "Raw TCP / UDP payload size in bytes", "64"),
            ("HTTP_PATH", "HTTP request path", "/"),
            ("CONNECTION_TYPE", "Label for the physical link", "cat6"),
            ("REPORT_PATH", "Write the JSON run report here", "results/run.json"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
            ("VERBOSE", "Print every attempt", "false"),
            ("DEBUG", "Enable debug logging", "false"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<28} {}\n", var, description));
            help.push_str(&format!("  {:<28} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Environment variables\n");
        help.push_str("  2. .env file values\n");
        help.push_str("  3. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_env_var_validation() {
        assert!(EnvManager::validate_env_var("TARGET_ADDRESS", "10.0.0.1").is_ok());
        assert!(EnvManager::validate_env_var("TARGET_PORT", "5000").is_ok());
        assert!(EnvManager::validate_env_var("NUM_TESTS", "200").is_ok());
        assert!(EnvManager::validate_env_var("TIMEOUT_SECONDS", "0.5").is_ok());
        assert!(EnvManager::validate_env_var("PROTOCOL_MODE", "udp").is_ok());
        assert!(EnvManager::validate_env_var("CONCURRENCY_MODE", "async").is_ok());
        assert!(EnvManager::validate_env_var("DYNAMIC_PORT_CHECK", "true").is_ok());
        assert!(EnvManager::validate_env_var("CONNECTION_TYPE", "anything goes").is_ok());

        assert!(EnvManager::validate_env_var("TARGET_ADDRESS", "http://10.0.0.1").is_err());
        assert!(EnvManager::validate_env_var("TARGET_PORT", "0").is_err());
        assert!(EnvManager::validate_env_var("TARGET_PORT", "70000").is_err());
        assert!(EnvManager::validate_env_var("NUM_TESTS", "0").is_err());
        assert!(EnvManager::validate_env_var("TIMEOUT_SECONDS", "0").is_err());
        assert!(EnvManager::validate_env_var("TIMEOUT_SECONDS", "301").is_err());
        assert!(EnvManager::validate_env_var("DELAY_SECONDS", "-1").is_err());
        assert!(EnvManager::validate_env_var("PROTOCOL_MODE", "sctp").is_err());
        assert!(EnvManager::validate_env_var("MAX_RETRIES", "11").is_err());
        assert!(EnvManager::validate_env_var("HTTP_PATH", "index.html").is_err());
        assert!(EnvManager::validate_env_var("VERBOSE", "maybe").is_err());
    }

    #[test]
    fn test_example_env_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (var, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", var)), "missing {}", var);
        }
    }

    #[test]
    fn test_save_example_env_file() {
        let file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(file.path()).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, EnvManager::create_example_env_content());
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.env");
        assert!(EnvManager::load_env_file_from(&path, false).is_ok());
    }

    #[test]
    fn test_env_help_mentions_priority() {
        let help = EnvManager::display_env_help();
        assert!(help.contains("TARGET_ADDRESS"));
        assert!(help.contains("Configuration Priority"));
    }
}
