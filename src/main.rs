//! Packet Loss Tester - command-line entry point
//!
//! Configured entirely from `.env` and environment variables; see
//! `.env.example` for the supported keys.

use packet_loss_tester::{
    app::App,
    config::EnvManager,
    error::{AppError, ErrorReporter, Result},
    RunReport,
};
use std::process;

#[tokio::main]
async fn main() {
    // Report panics but let them unwind; a panicking attempt task is
    // recorded by the harness instead of ending the run
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
    }));

    let (use_color, verbose) = color_and_verbosity();

    if let Err(e) = run_application().await {
        ErrorReporter::new(use_color, verbose).report_error(&e);
        print_error_suggestions(&e, verbose);
        process::exit(e.exit_code());
    }
}

async fn run_application() -> Result<()> {
    let app = App::from_env()?;
    let report = app.run().await?;

    check_outcome(&report)
}

/// A run where nothing got through is reported as a failure
fn check_outcome(report: &RunReport) -> Result<()> {
    if report.stats.num_tests > 0 && report.stats.success_count == 0 {
        Err(AppError::test_execution(format!(
            "No attempt out of {} succeeded against {}",
            report.stats.num_tests, report.stats.target
        )))
    } else {
        Ok(())
    }
}

/// Read the color and verbosity flags before the config exists
fn color_and_verbosity() -> (bool, bool) {
    let flag = |key: &str, default: bool| {
        std::env::var(key)
            .ok()
            .and_then(|v| v.trim().to_lowercase().parse::<bool>().ok())
            .unwrap_or(default)
    };
    (flag("ENABLE_COLOR", true), flag("VERBOSE", false) || flag("DEBUG", false))
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError, verbose: bool) {
    match error {
        AppError::Config(_) | AppError::Validation(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - TARGET_ADDRESS must be a bare host or IP, without a scheme");
            eprintln!("  - PROTOCOL_MODE is one of http, tcp, udp");
            eprintln!("  - CONCURRENCY_MODE is one of sync, async");
            if verbose {
                eprintln!();
                eprintln!("{}", EnvManager::display_env_help());
            }
        }
        AppError::Network(_) | AppError::Connection(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check the cable or radio link to the device");
            eprintln!("  - Verify the device is listening on the target port");
            eprintln!("  - Enable DYNAMIC_PORT_CHECK to separate link drops from request failures");
        }
        AppError::TestExecution(_) => {
            eprintln!();
            eprintln!("Execution troubleshooting:");
            eprintln!("  - Increase TIMEOUT_SECONDS");
            eprintln!("  - Confirm the echo peer is running for tcp/udp modes");
        }
        _ => {}
    }
}
