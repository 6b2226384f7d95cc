//! Configuration assembly from defaults, .env and process environment

use crate::{config::env::EnvManager, error::Result, models::Config};
use std::path::PathBuf;

/// Configuration parser that layers the .env file and environment over defaults
pub struct ConfigParser {
    env_file: PathBuf,
    debug: bool,
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigParser {
    /// Parser reading `.env` from the working directory
    pub fn new() -> Self {
        let debug = std::env::var("DEBUG")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            env_file: PathBuf::from(".env"),
            debug,
        }
    }

    /// Read a different env file
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = path.into();
        self
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file_from(&self.env_file, self.debug)?;

        config.merge_from_env()?;

        config.validate()?;

        if config.debug {
            println!("Resolved configuration:\n{}", display_config_summary(&config));
        }

        Ok(config)
    }
}

/// Convenience function to load the complete configuration
pub fn load_config() -> Result<Config> {
    ConfigParser::new().parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Target: {}", config.target_description()));
    summary.push(format!("Protocol: {}", config.protocol_mode));
    summary.push(format!("Concurrency: {}", config.concurrency_mode));
    summary.push(format!("Attempts: {}", config.num_tests));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Delay: {}s", config.delay_seconds));
    summary.push(format!(
        "Port Check: {}",
        if config.dynamic_port_check {
            format!("on ({}s)", config.port_check_timeout_seconds)
        } else {
            "off".to_string()
        }
    ));
    if config.protocol_mode.supports_retries() {
        summary.push(format!("Retries: {} (backoff {}s)", config.max_retries, config.backoff_factor));
        summary.push(format!("Path: {}", config.http_path));
    } else {
        summary.push(format!("Payload: {} bytes", config.payload_size));
    }
    summary.push(format!("Connection Type: {}", config.connection_type));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
