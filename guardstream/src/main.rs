// guardstream/src/main.rs
//! guardstream entry point.
//!
//! Loads `.env`, sets up logging and the colour theme, then dispatches to a command.
//! Exit code 0 means the session completed; 1 means setup failed or the session did.

use anyhow::{Context, Result};
use clap::Parser;
use is_terminal::IsTerminal;
use log::debug;
use std::process::ExitCode;

use guardstream::cli::{Cli, Commands};
use guardstream::commands::{detect, stream};
use guardstream::logger;
use guardstream::ui::output_format;
use guardstream::ui::theme::{ThemeMap, ThemeStyle, build_theme_map};
use guardstream_core::SessionOutcome;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }
    logger::init_logger(logger::level_from_flags(args.quiet, args.debug));

    let theme = match build_theme_map(args.theme.as_deref()).context("Theme error") {
        Ok(theme) => theme,
        Err(e) => {
            let fallback = ThemeStyle::default_theme_map();
            report_error(&format!("{:#}", e), &fallback);
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &theme).await {
        Ok(code) => code,
        Err(e) => {
            report_error(&format!("{:#}", e), &theme);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Cli, theme: &ThemeMap) -> Result<ExitCode> {
    match &args.command {
        Commands::Stream(cmd) => {
            let report = stream::run_stream(cmd, theme).await?;
            match report.outcome {
                SessionOutcome::Completed => {
                    if report.detector_failures > 0 {
                        let enable_colors = std::io::stderr().is_terminal();
                        let _ = output_format::print_warn_message(
                            &mut std::io::stderr(),
                            &format!(
                                "{} of {} check(s) ran without a detector; that text was passed through unredacted.",
                                report.detector_failures, report.flushes
                            ),
                            theme,
                            enable_colors,
                        );
                    }
                    Ok(ExitCode::SUCCESS)
                }
                SessionOutcome::Failed(reason) => {
                    report_error(&format!("Sanitization session failed: {}", reason), theme);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Detect(cmd) => {
            detect::run_detect(cmd, theme).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn report_error(msg: &str, theme: &ThemeMap) {
    let enable_colors = std::io::stderr().is_terminal();
    let _ = output_format::print_error_message(&mut std::io::stderr(), msg, theme, enable_colors);
}
