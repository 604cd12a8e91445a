//! Command-line interface module

use clap::{ArgAction, Parser};
use console::style;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::conversion::config::{DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_SIZE};
use crate::conversion::{
    BatchConverter, BatchOptions, BatchReport, ConversionConfig, ExitStatus, NoProgress,
    ProgressObserver,
};
use crate::error::{BatchError, BatchResult};

/// Main CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "txt2utf8")]
#[command(about = "Convert text files of unknown encoding to UTF-8")]
#[command(version)]
#[command(long_about = None)]
pub struct Args {
    /// Input file or directory
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file or directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of concurrent workers (default: CPU count, at most 8)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Replace outputs that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Only convert files directly inside the input directory
    #[arg(long)]
    pub no_recursive: bool,

    /// File extension to convert; repeat for several (default: txt)
    #[arg(short = 'e', long = "extension", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Streaming chunk size (e.g. 64KB, 1MB; default: 1MB)
    #[arg(long, value_name = "SIZE")]
    pub chunk_size: Option<String>,

    /// Bytes sampled for encoding detection (default: 1MB)
    #[arg(long, value_name = "SIZE")]
    pub sample_size: Option<String>,

    /// Comma-separated fallback encodings tried on low confidence
    #[arg(long, value_delimiter = ',', value_name = "LABELS")]
    pub fallback: Vec<String>,

    /// Minimum detection confidence, 0.0-1.0 (default: 0.5)
    #[arg(long, value_name = "F")]
    pub min_confidence: Option<f32>,

    /// Replace malformed sequences with U+FFFD instead of failing the file
    #[arg(long)]
    pub lossy: bool,

    /// Write the batch report as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub args: Args,
    pub conversion_config: ConversionConfig,
    pub batch_options: BatchOptions,
}

impl CliConfig {
    /// Create CLI configuration from arguments
    pub fn from_args(args: Args) -> CliResult<Self> {
        let conversion_config = Self::create_conversion_config(&args)?;
        let batch_options = BatchOptions {
            workers: args.workers,
            recursive: !args.no_recursive,
            overwrite: args.overwrite,
        };

        Ok(Self {
            args,
            conversion_config,
            batch_options,
        })
    }

    /// Create conversion configuration from CLI arguments
    fn create_conversion_config(args: &Args) -> CliResult<ConversionConfig> {
        let chunk_size = parse_size(args.chunk_size.as_deref(), DEFAULT_CHUNK_SIZE)?;
        let sample_size = parse_size(args.sample_size.as_deref(), DEFAULT_SAMPLE_SIZE)?;

        let mut config = ConversionConfig::default()
            .with_chunk_size(chunk_size)
            .with_sample_size(sample_size)
            .with_lossy(args.lossy);

        if let Some(threshold) = args.min_confidence {
            config = config.with_confidence_threshold(threshold);
        }
        if !args.fallback.is_empty() {
            config = config.with_fallback_encodings(
                args.fallback.iter().map(|label| label.trim()).filter(|l| !l.is_empty()),
            );
        }
        if !args.extensions.is_empty() {
            config = config.with_extensions(&args.extensions);
        }

        config.validate().map_err(BatchError::Configuration)?;
        config
            .resolve_fallbacks()
            .map_err(BatchError::Configuration)?;

        Ok(config)
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.args.quiet
    }

    /// Whether a progress bar should be drawn
    pub fn show_progress(&self) -> bool {
        !self.args.quiet && !self.args.no_progress && atty::is(atty::Stream::Stderr)
    }
}

/// Parse a size such as "64KB", "1MB" or "4096"
fn parse_size(value: Option<&str>, default: usize) -> CliResult<usize> {
    let Some(value) = value else {
        return Ok(default);
    };
    let normalized = value.trim().to_uppercase();
    let invalid = || BatchError::Configuration(format!("Invalid size: {}", value));

    let (number, multiplier) = [("GB", 1024 * 1024 * 1024), ("MB", 1024 * 1024), ("KB", 1024), ("B", 1)]
        .iter()
        .find_map(|(suffix, multiplier)| {
            normalized
                .strip_suffix(*suffix)
                .map(|number| (number.trim(), *multiplier as f64))
        })
        .unwrap_or((normalized.as_str(), 1.0));

    let parsed = number.parse::<f64>().map_err(|_| invalid())?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(invalid());
    }
    Ok((parsed * multiplier) as usize)
}

/// CLI utilities and helpers
pub struct CliUtils;

impl CliUtils {
    /// Format a file size in human-readable format
    pub fn format_file_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit = 0;

        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }

        if unit == 0 {
            format!("{} {}", bytes, UNITS[0])
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }

    /// Format a duration in human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let millis = duration.as_millis();

        if millis < 1000 {
            format!("{}ms", millis)
        } else if millis < 60_000 {
            format!("{:.1}s", millis as f64 / 1000.0)
        } else {
            format!("{}m {}s", millis / 60_000, (millis % 60_000) / 1000)
        }
    }

    /// Create a progress bar for file processing; hidden when `visible` is false
    pub fn create_progress_bar(visible: bool) -> indicatif::ProgressBar {
        if !visible {
            return indicatif::ProgressBar::hidden();
        }
        let pb = indicatif::ProgressBar::new(0);
        pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Show a success message (if not in quiet mode)
    pub fn show_success(message: &str, quiet: bool) {
        if !quiet {
            println!("{} {}", style("✓").green(), message);
        }
    }

    /// Show an error message
    pub fn show_error(message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    /// Show a warning message (if not in quiet mode)
    pub fn show_warning(message: &str, quiet: bool) {
        if !quiet {
            eprintln!("{} {}", style("⚠").yellow(), message);
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `-v`.
pub fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    // A second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the batch described by `config` and print the result
pub fn execute(config: &CliConfig) -> ExitStatus {
    let batch = BatchConverter::new(
        config.conversion_config.clone(),
        config.batch_options.clone(),
    );

    let progress = CliUtils::create_progress_bar(config.show_progress());
    let observer: &dyn ProgressObserver = if progress.is_hidden() {
        &NoProgress
    } else {
        &progress
    };

    let result = batch.run(&config.args.input, &config.args.output, observer);
    progress.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            handle_error(&e);
            return ExitStatus::FatalError;
        }
    };

    print_report(&report, config);

    let mut status = report.exit_status();
    if let Some(path) = &config.args.report {
        if let Err(e) = write_report(&report, path) {
            CliUtils::show_error(&format!("Could not write report {}: {}", path.display(), e));
            if status == ExitStatus::AllSucceeded {
                status = ExitStatus::PartialFailure;
            }
        }
    }

    status
}

fn print_report(report: &BatchReport, config: &CliConfig) {
    let quiet = config.is_quiet();
    let line = format!("{} → {}", report.summary(), config.args.output.display());

    if report.has_failures() || !report.complete {
        CliUtils::show_warning(&line, quiet);
    } else {
        CliUtils::show_success(&line, quiet);
    }

    if !quiet && report.statistics.bytes_in > 0 {
        println!(
            "  {} in, {} out, {}",
            CliUtils::format_file_size(report.statistics.bytes_in),
            CliUtils::format_file_size(report.statistics.bytes_out),
            CliUtils::format_duration(Duration::from_millis(report.statistics.elapsed_ms))
        );
    }

    for outcome in &report.failed {
        CliUtils::show_error(&format!(
            "{}: {}",
            outcome.source_path.display(),
            outcome.error.as_deref().unwrap_or("unknown error")
        ));
    }
}

fn write_report(report: &BatchReport, path: &std::path::Path) -> anyhow::Result<()> {
    let json = report.to_json()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    Ok(())
}

/// Handle CLI errors with user-friendly messages
pub fn handle_error(error: &BatchError) {
    CliUtils::show_error(&error.user_message());

    if let Some(hint) = error.hint() {
        eprintln!("\nTip: {}", hint);
    }

    eprintln!("\nTry 'txt2utf8 --help' for usage information.");
}

/// Command execution result
pub type CliResult<T> = BatchResult<T>;
