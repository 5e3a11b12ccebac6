mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::process::ExitCode;
use tracing::Level;

use cli::{Cli, FileReport, collect_paths, report_for};
use stegoguard::Analyzer;

const EXIT_REJECTED: u8 = 2;

fn init_tracing(cli: &Cli) {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let files = collect_paths(&cli.paths)?;
    let analyzer = Analyzer::new(cli.analyzer_config());
    tracing::info!(files = files.len(), "analyzing");

    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| report_for(&analyzer, path, cli.declared_mime.as_deref()))
        .collect();

    let mut rejected = 0usize;
    for report in &reports {
        let json = if cli.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        }
        .with_context(|| format!("Failed to serialize report for {}", report.file))?;
        println!("{json}");
        if report.is_rejected() {
            rejected += 1;
        }
    }

    tracing::info!(total = reports.len(), rejected, "done");
    if rejected > 0 {
        Ok(ExitCode::from(EXIT_REJECTED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
