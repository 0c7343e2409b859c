//! # tlog-extract
//!
//! Extracts the container log files of a YARN aggregated log archive into a
//! directory, one subdirectory per container:
//!
//! ```text
//! $ tlog-extract application_1700000000000_0001.tfile out/
//! INFO Extracting from application_1700000000000_0001.tfile: size is 48211 bytes
//! INFO application_1700000000000_0001.tfile: VERSION=
//! INFO application_1700000000000_0001.tfile: APPLICATION_OWNER=alice
//! INFO Extracting log files under out/container_1700000000000_0001_01_000001
//! 1 containers, 3 files, 47602 bytes written to out/
//! ```
//!
//! ## Configuration
//!
//! ```text
//! TLOG_CONTAINER_PREFIX  key prefix of container-log records (default: "container_")
//! TLOG_WRITE_BUFFER_KB   output file buffer size in KiB       (default: 64)
//! TLOG_LOG               tracing filter directive             (default: "info")
//! ```
//!
//! Diagnostics go to stderr; the final summary line goes to stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use config::ExtractorConfig;
use extractor::LogExtractor;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Extract the log files of a YARN aggregated log archive
#[derive(Parser, Debug)]
#[command(name = "tlog-extract", version)]
#[command(about = "Extract the log files of a YARN aggregated log archive", long_about = None)]
struct Cli {
    /// Aggregated log archive (TFile)
    archive: PathBuf,

    /// Directory receiving one subdirectory per container
    output_dir: PathBuf,
}

fn init_tracing(filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(filter).with_context(|| format!("invalid log filter {:?}", filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ExtractorConfig::from_env().context("invalid configuration")?;
    init_tracing(&config.log_filter)?;

    let extractor = LogExtractor::local(config);
    debug!(?extractor, "starting");

    let summary = extractor
        .extract(&cli.archive, &cli.output_dir)
        .with_context(|| {
            format!(
                "failed to extract {} into {}",
                cli.archive.display(),
                cli.output_dir.display()
            )
        })?;

    println!(
        "{} containers, {} files, {} bytes written to {}",
        summary.containers.len(),
        summary.file_count(),
        summary.bytes_written(),
        cli.output_dir.display()
    );
    Ok(())
}
