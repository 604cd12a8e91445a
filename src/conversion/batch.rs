//! Batch orchestration: discovery, planning, dispatch and aggregation

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::conversion::config::ConversionConfig;
use crate::conversion::engine::{ConversionRequest, Converter};
use crate::conversion::pool::{CancellationToken, WorkerPool};
use crate::conversion::stats::{BatchReport, ConversionOutcome};
use crate::discovery::path_mapping::{map_input_to_output, resolve_single_output};
use crate::discovery::{self, InputKind};
use crate::error::{BatchError, BatchResult};

/// Options that shape a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Worker threads; `None` picks the CPU-based default
    pub workers: Option<usize>,
    pub recursive: bool,
    pub overwrite: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: None,
            recursive: true,
            overwrite: false,
        }
    }
}

impl BatchOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Receives progress events from worker threads.
///
/// Calls arrive concurrently from several workers, so implementations must be
/// cheap and must not block.
pub trait ProgressObserver: Send + Sync {
    fn on_file_started(&self, _source: &Path) {}

    /// `completed` counts finished files including this one
    fn on_file_finished(&self, outcome: &ConversionOutcome, completed: usize, total: usize);
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_file_finished(&self, _outcome: &ConversionOutcome, _completed: usize, _total: usize) {}
}

impl ProgressObserver for indicatif::ProgressBar {
    fn on_file_finished(&self, outcome: &ConversionOutcome, completed: usize, total: usize) {
        self.set_length(total as u64);
        self.set_position(completed as u64);
        if let Some(name) = outcome.source_path.file_name() {
            self.set_message(name.to_string_lossy().into_owned());
        }
    }
}

/// Converts every matching file under an input root into an output root
#[derive(Debug, Clone)]
pub struct BatchConverter {
    config: ConversionConfig,
    options: BatchOptions,
    cancel: CancellationToken,
}

impl BatchConverter {
    pub fn new(config: ConversionConfig, options: BatchOptions) -> Self {
        Self {
            config,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops this batch when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Discover inputs and pair each with its destination.
    ///
    /// Fails if the input is missing, nothing matches the extension filter,
    /// or two inputs would write the same output.
    pub fn plan(&self, input_root: &Path, output_root: &Path) -> BatchResult<Vec<ConversionRequest>> {
        let found = discovery::discover(
            input_root,
            self.options.recursive,
            &self.config.extensions,
            Some(output_root),
        )?;

        if found.files.is_empty() {
            return Err(BatchError::NoInputFiles {
                root: input_root.to_path_buf(),
                extensions: self.config.extensions_description(),
            });
        }

        let mut seen: HashMap<PathBuf, PathBuf> = HashMap::with_capacity(found.files.len());
        let mut requests = Vec::with_capacity(found.files.len());

        for source in found.files {
            let destination = match found.kind {
                InputKind::File => resolve_single_output(&source, output_root),
                InputKind::Directory => map_input_to_output(input_root, &source, output_root),
            };

            if let Some(first) = seen.insert(destination.clone(), source.clone()) {
                return Err(BatchError::DuplicateDestination {
                    first,
                    second: source,
                    destination,
                });
            }

            requests.push(ConversionRequest::new(
                source,
                destination,
                self.options.overwrite,
            ));
        }

        Ok(requests)
    }

    /// Run the batch, reporting progress to `observer`.
    ///
    /// Per-file problems end up in the report; only pre-flight problems are
    /// returned as errors.
    pub fn run(
        &self,
        input_root: &Path,
        output_root: &Path,
        observer: &dyn ProgressObserver,
    ) -> BatchResult<BatchReport> {
        self.config.validate().map_err(BatchError::Configuration)?;
        let converter = Converter::new(&self.config)
            .map_err(|e| BatchError::Configuration(e.to_string()))?
            .with_cancellation(self.cancel.clone());
        let pool = WorkerPool::with_requested(self.options.workers)?;

        let requests = self.plan(input_root, output_root)?;
        create_output_dir(input_root, output_root, &requests)?;

        let total = requests.len();
        info!(
            input = %input_root.display(),
            output = %output_root.display(),
            files = total,
            workers = pool.workers().min(total),
            "batch started"
        );

        let completed = AtomicUsize::new(0);
        let mut report = BatchReport::new(total);

        let run = pool.execute(
            requests,
            &self.cancel,
            |request: ConversionRequest| {
                observer.on_file_started(&request.source_path);
                let outcome = converter.convert(&request);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                observer.on_file_finished(&outcome, done, total);
                outcome
            },
            |outcome| report.record(outcome),
        )?;

        report.finalize(run.not_started, self.cancel.is_cancelled());
        info!(
            succeeded = report.succeeded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            pending = report.pending,
            elapsed_ms = report.statistics.elapsed_ms,
            "batch finished"
        );

        Ok(report)
    }
}

fn create_output_dir(
    input_root: &Path,
    output_root: &Path,
    requests: &[ConversionRequest],
) -> BatchResult<()> {
    let dir = if input_root.is_file() {
        requests
            .first()
            .and_then(|request| request.destination_path.parent())
            .filter(|parent| !parent.as_os_str().is_empty())
    } else {
        Some(output_root)
    };

    if let Some(dir) = dir {
        debug!(path = %dir.display(), "ensuring output directory");
        fs::create_dir_all(dir).map_err(|source| BatchError::OutputDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Convert `input_root` into `output_root` with the default configuration
pub fn run_batch(
    input_root: &Path,
    output_root: &Path,
    options: &BatchOptions,
) -> BatchResult<BatchReport> {
    BatchConverter::new(ConversionConfig::default(), options.clone()).run(
        input_root,
        output_root,
        &NoProgress,
    )
}
