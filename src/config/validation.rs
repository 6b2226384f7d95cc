//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::Config,
    types::{ConcurrencyMode, ProtocolMode},
};
use std::net::IpAddr;

/// Configuration validator with advisory rules on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        warnings.extend(Self::validate_target(config));
        warnings.extend(Self::validate_timing(config));
        warnings.extend(Self::validate_protocol_settings(config));

        Ok(warnings)
    }

    fn validate_target(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        match config.target_address.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) if ip.is_loopback() => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Target {} is loopback; results will not reflect a physical link", ip),
                ));
            }
            Ok(IpAddr::V4(ip)) if !ip.is_private() && !ip.is_link_local() => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Target {} is outside private ranges; upstream loss will be included", ip),
                ));
            }
            Ok(_) => {}
            Err(_) => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Target '{}' is a host name and will be resolved per attempt", config.target_address),
                ));
            }
        }

        warnings
    }

    fn validate_timing(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.num_tests < 20 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "{} attempts give a loss resolution of {:.1}%",
                    config.num_tests,
                    100.0 / config.num_tests as f64
                ),
            ));
        }

        if config.timeout_seconds < 0.1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Timeout of {}s may classify slow replies as loss", config.timeout_seconds),
            ));
        } else if config.timeout_seconds > 30.0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long timeout of {}s will slow down failure detection", config.timeout_seconds),
            ));
        }

        if config.dynamic_port_check && config.port_check_timeout_seconds >= config.timeout_seconds {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Port check timeout ({}s) is not shorter than the request timeout ({}s)",
                    config.port_check_timeout_seconds, config.timeout_seconds
                ),
            ));
        }

        let estimated = match config.concurrency_mode {
            ConcurrencyMode::Sync => config.num_tests as f64 * (config.timeout_seconds + config.delay_seconds),
            ConcurrencyMode::Async => config.num_tests as f64 * config.delay_seconds + config.timeout_seconds,
        };
        if estimated > 3600.0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Worst-case run time is about {:.0} minutes", estimated / 60.0),
            ));
        }

        if config.concurrency_mode == ConcurrencyMode::Async && config.delay_seconds == 0.0 && config.num_tests > 1000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("{} attempts will be in flight at once", config.num_tests),
            ));
        }

        warnings
    }

    fn validate_protocol_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if !config.protocol_mode.supports_retries() && config.max_retries != crate::defaults::DEFAULT_MAX_RETRIES {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("MAX_RETRIES is ignored in {} mode", config.protocol_mode),
            ));
        }

        if config.protocol_mode == ProtocolMode::Http && config.payload_size != crate::defaults::DEFAULT_PAYLOAD_SIZE {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "PAYLOAD_SIZE is ignored in HTTP mode".to_string(),
            ));
        }

        if config.protocol_mode == ProtocolMode::Udp && config.payload_size > 1400 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("UDP payload of {} bytes may be fragmented on a 1500-byte MTU", config.payload_size),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        use colored::Colorize;

        let tag = format!("[{}]", self.level.as_str());
        let tag = if use_color {
            match self.level {
                ValidationLevel::Info => tag.blue().to_string(),
                ValidationLevel::Warning => tag.yellow().to_string(),
                ValidationLevel::Error => tag.red().bold().to_string(),
            }
        } else {
            tag
        };

        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_errors() {
        let warnings = validate_config(&Config::default()).unwrap();
        assert!(warnings.iter().all(|w| w.level != ValidationLevel::Error));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            num_tests: 0,
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_loopback_target_is_flagged() {
        let config = Config {
            target_address: "127.0.0.1".to_string(),
            ..Default::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(warnings.iter().any(|w| w.message.contains("loopback")));
    }

    #[test]
    fn test_small_run_resolution_warning() {
        let config = Config {
            num_tests: 10,
            ..Default::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.level == ValidationLevel::Warning && w.message.contains("10.0%")));
    }

    #[test]
    fn test_port_check_timeout_not_shorter_warning() {
        let config = Config {
            dynamic_port_check: true,
            port_check_timeout_seconds: 3.0,
            timeout_seconds: 2.0,
            ..Default::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(warnings.iter().any(|w| w.message.contains("Port check timeout")));
    }

    #[test]
    fn test_retries_ignored_outside_http() {
        let config = Config {
            protocol_mode: ProtocolMode::Udp,
            max_retries: 5,
            ..Default::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(warnings.iter().any(|w| w.message.contains("MAX_RETRIES is ignored")));
    }

    #[test]
    fn test_warning_format_plain() {
        let warning = ValidationWarning::new(ValidationLevel::Warning, "careful".to_string());
        assert_eq!(warning.format(false), "[WARNING] careful");
    }
}
