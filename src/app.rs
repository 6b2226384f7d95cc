//! Main application orchestration and execution

use crate::{
    config::{load_config, validate_config, EnvManager},
    error::Result,
    harness::{PacketLossTester, RunReport},
    log_debug, log_info,
    logging::LoggerFactory,
    models::Config,
    output::{JsonReportWriter, OutputFormatter, OutputFormatterFactory},
};
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
    formatter: Box<dyn OutputFormatter>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let formatter = OutputFormatterFactory::from_config(&config);
        Self { config, formatter }
    }

    /// Build from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(load_config()?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one packet loss test and print its summary
    pub async fn run(self) -> Result<RunReport> {
        let config = &self.config;
        let factory = LoggerFactory::new(config.clone());
        let logger = factory.create_logger("APP").await;

        log_info!(
            logger,
            "{} v{} ({}, built {})",
            crate::PKG_NAME,
            crate::VERSION,
            crate::GIT_COMMIT,
            crate::BUILD_TIME
        );

        for warning in validate_config(config)? {
            println!("{}", warning.format(config.enable_color));
        }

        if config.debug {
            for warning in EnvManager::validate_current_env() {
                println!("{}", warning);
            }
        }

        let tester = PacketLossTester::from_config(config)?
            .with_attempt_logger(Arc::new(factory.create_attempt_logger().await))
            .with_error_logger(Arc::new(factory.create_error_logger().await));

        log_debug!(
            logger,
            "Probe {} before each attempt: {}",
            tester.settings().port,
            tester.settings().dynamic_port_check
        );

        let run_logger = factory.create_run_logger().await;
        let correlation_id = run_logger.log_run_start(config).await;

        let report = match tester.run(config.delay()).await {
            Ok(report) => report,
            Err(error) => {
                factory
                    .create_error_logger()
                    .await
                    .log_error(&error, Some("Run aborted"))
                    .await;
                return Err(error);
            }
        };

        run_logger.log_run_complete(&report.stats, &correlation_id).await;

        println!();
        println!("{}", self.formatter.format_report(&report)?);

        if let Some(ref path) = config.report_path {
            let writer = JsonReportWriter::new(path);
            writer.write(&report).await?;
            println!();
            println!(
                "{}",
                self.formatter
                    .format_success(&format!("Report written to {}", writer.path().display()))?
            );
        }

        Ok(report)
    }
}
