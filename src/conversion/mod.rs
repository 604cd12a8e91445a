//! Conversion pipeline: configuration, single-file engine, worker pool,
//! batch orchestration and reporting.

pub mod batch;
pub mod config;
pub mod engine;
pub mod pool;
pub mod stats;

pub use batch::{run_batch, BatchConverter, BatchOptions, NoProgress, ProgressObserver};
pub use config::ConversionConfig;
pub use engine::{ConversionRequest, Converter};
pub use pool::{CancellationToken, WorkerPool};
pub use stats::{BatchReport, BatchStatistics, ConversionOutcome, ExitStatus, OutcomeStatus};
