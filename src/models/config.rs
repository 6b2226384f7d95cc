//! Configuration data model and validation

use crate::types::{AppError, ConcurrencyMode, ProtocolMode, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host name or IP address of the device under test
    #[serde(default = "default_target_address")]
    pub target_address: String,

    /// Target port; falls back to the protocol default when unset
    #[serde(default)]
    pub port: Option<u16>,

    /// Number of attempts per run
    #[serde(default = "default_num_tests")]
    pub num_tests: u32,

    /// Per-attempt request deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: f64,

    /// Pause between attempts (sync) or between dispatches (async), in seconds
    #[serde(default)]
    pub delay_seconds: f64,

    /// Wire protocol used for each attempt
    #[serde(default = "default_protocol_mode")]
    pub protocol_mode: ProtocolMode,

    /// Sequential or fan-out scheduling
    #[serde(default = "default_concurrency_mode")]
    pub concurrency_mode: ConcurrencyMode,

    /// Probe the TCP port before every attempt and skip the attempt if closed
    #[serde(default)]
    pub dynamic_port_check: bool,

    /// Deadline for the pre-flight port probe in seconds
    #[serde(default = "default_port_check_timeout_secs")]
    pub port_check_timeout_seconds: f64,

    /// Transport-level retry budget per HTTP attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff between HTTP retries, in seconds
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Size of the raw TCP / UDP test payload in bytes
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,

    /// Request path for HTTP mode
    #[serde(default = "default_http_path")]
    pub http_path: String,

    /// Free-form label for the physical link (cable type, radio, ...)
    #[serde(default = "default_connection_type")]
    pub connection_type: String,

    /// Write the JSON run report here when set
    #[serde(default)]
    pub report_path: Option<String>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_address: default_target_address(),
            port: None,
            num_tests: default_num_tests(),
            timeout_seconds: default_timeout_secs(),
            delay_seconds: 0.0,
            protocol_mode: default_protocol_mode(),
            concurrency_mode: default_concurrency_mode(),
            dynamic_port_check: false,
            port_check_timeout_seconds: default_port_check_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            payload_size: default_payload_size(),
            http_path: default_http_path(),
            connection_type: default_connection_type(),
            report_path: None,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Port actually used for requests and probes
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol_mode.default_port())
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout_seconds)
    }

    /// Get the inter-attempt delay as Duration
    pub fn delay(&self) -> Duration {
        seconds(self.delay_seconds)
    }

    /// Get the port probe timeout as Duration
    pub fn port_check_timeout(&self) -> Duration {
        seconds(self.port_check_timeout_seconds)
    }

    /// `host:port` form of the target
    pub fn target_description(&self) -> String {
        format!("{}:{}", self.target_address, self.effective_port())
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        let address = self.target_address.trim();
        if address.is_empty() {
            return Err(AppError::config("Target address cannot be empty"));
        }

        if address.contains("://") || address.contains('/') {
            return Err(AppError::config(format!(
                "Target address '{}' must be a bare host or IP, without scheme or path",
                address
            )));
        }

        if self.port == Some(0) {
            return Err(AppError::config("Target port must be greater than 0"));
        }

        if self.num_tests == 0 {
            return Err(AppError::config("Number of tests must be greater than 0"));
        }

        if self.num_tests > crate::defaults::MAX_NUM_TESTS {
            return Err(AppError::config(format!(
                "Number of tests cannot exceed {}",
                crate::defaults::MAX_NUM_TESTS
            )));
        }

        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > 300.0 {
            return Err(AppError::config("Timeout cannot exceed 300 seconds"));
        }

        if !self.delay_seconds.is_finite() || self.delay_seconds < 0.0 {
            return Err(AppError::config("Delay between attempts cannot be negative"));
        }

        if self.delay_seconds > 3600.0 {
            return Err(AppError::config("Delay between attempts cannot exceed 3600 seconds"));
        }

        if !self.port_check_timeout_seconds.is_finite() || self.port_check_timeout_seconds <= 0.0 {
            return Err(AppError::config("Port check timeout must be greater than 0"));
        }

        if self.port_check_timeout_seconds > 300.0 {
            return Err(AppError::config("Port check timeout cannot exceed 300 seconds"));
        }

        if self.max_retries > 10 {
            return Err(AppError::config("Retry budget cannot exceed 10"));
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(AppError::config("Backoff factor cannot be negative"));
        }

        if self.backoff_factor > 60.0 {
            return Err(AppError::config("Backoff factor cannot exceed 60 seconds"));
        }

        if self.payload_size == 0 {
            return Err(AppError::config("Payload size must be greater than 0"));
        }

        if self.protocol_mode == ProtocolMode::Udp
            && self.payload_size > crate::defaults::MAX_UDP_PAYLOAD
        {
            return Err(AppError::config(format!(
                "UDP payload cannot exceed {} bytes",
                crate::defaults::MAX_UDP_PAYLOAD
            )));
        }

        if !self.http_path.starts_with('/') {
            return Err(AppError::config(format!(
                "HTTP path '{}' must start with '/'",
                self.http_path
            )));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(address) = std::env::var("TARGET_ADDRESS") {
            self.target_address = address.trim().to_string();
        }

        if let Ok(port) = std::env::var("TARGET_PORT") {
            self.port = Some(port.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TARGET_PORT value '{}': {}", port, e)))?);
        }

        if let Ok(num_tests) = std::env::var("NUM_TESTS") {
            self.num_tests = num_tests.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid NUM_TESTS value '{}': {}", num_tests, e)))?;
        }

        if let Ok(timeout) = std::env::var("TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Ok(delay) = std::env::var("DELAY_SECONDS") {
            self.delay_seconds = delay.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid DELAY_SECONDS value '{}': {}", delay, e)))?;
        }

        if let Ok(mode) = std::env::var("PROTOCOL_MODE") {
            self.protocol_mode = mode.parse()
                .map_err(|e| AppError::config(format!("Invalid PROTOCOL_MODE value: {}", e)))?;
        }

        if let Ok(mode) = std::env::var("CONCURRENCY_MODE") {
            self.concurrency_mode = mode.parse()
                .map_err(|e| AppError::config(format!("Invalid CONCURRENCY_MODE value: {}", e)))?;
        }

        if let Ok(check) = std::env::var("DYNAMIC_PORT_CHECK") {
            self.dynamic_port_check = check.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid DYNAMIC_PORT_CHECK value '{}': {}", check, e)))?;
        }

        if let Ok(timeout) = std::env::var("PORT_CHECK_TIMEOUT_SECONDS") {
            self.port_check_timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PORT_CHECK_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Ok(retries) = std::env::var("MAX_RETRIES") {
            self.max_retries = retries.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid MAX_RETRIES value '{}': {}", retries, e)))?;
        }

        if let Ok(factor) = std::env::var("BACKOFF_FACTOR") {
            self.backoff_factor = factor.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid BACKOFF_FACTOR value '{}': {}", factor, e)))?;
        }

        if let Ok(size) = std::env::var("PAYLOAD_SIZE") {
            self.payload_size = size.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PAYLOAD_SIZE value '{}': {}", size, e)))?;
        }

        if let Ok(path) = std::env::var("HTTP_PATH") {
            self.http_path = path.trim().to_string();
        }

        if let Ok(label) = std::env::var("CONNECTION_TYPE") {
            self.connection_type = label.trim().to_string();
        }

        if let Ok(path) = std::env::var("REPORT_PATH") {
            let path = path.trim();
            self.report_path = if path.is_empty() { None } else { Some(path.to_string()) };
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        if let Ok(verbose) = std::env::var("VERBOSE") {
            self.verbose = verbose.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid VERBOSE value '{}': {}", verbose, e)))?;
        }

        if let Ok(debug) = std::env::var("DEBUG") {
            self.debug = debug.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid DEBUG value '{}': {}", debug, e)))?;
        }

        Ok(())
    }
}

/// Seconds as a `Duration`, saturating instead of panicking on overflow
pub(crate) fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 { Duration::MAX } else { Duration::ZERO })
}

// Default value functions for serde
fn default_target_address() -> String {
    crate::defaults::DEFAULT_TARGET_ADDRESS.to_string()
}

fn default_num_tests() -> u32 {
    crate::defaults::DEFAULT_NUM_TESTS
}

fn default_timeout_secs() -> f64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs_f64()
}

fn default_protocol_mode() -> ProtocolMode {
    ProtocolMode::Http
}

fn default_concurrency_mode() -> ConcurrencyMode {
    ConcurrencyMode::Sync
}

fn default_port_check_timeout_secs() -> f64 {
    crate::defaults::DEFAULT_PORT_CHECK_TIMEOUT.as_secs_f64()
}

fn default_max_retries() -> u32 {
    crate::defaults::DEFAULT_MAX_RETRIES
}

fn default_backoff_factor() -> f64 {
    crate::defaults::DEFAULT_BACKOFF_FACTOR
}

fn default_payload_size() -> usize {
    crate::defaults::DEFAULT_PAYLOAD_SIZE
}

fn default_http_path() -> String {
    "/".to_string()
}

fn default_connection_type() -> String {
    crate::defaults::DEFAULT_CONNECTION_TYPE.to_string()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
