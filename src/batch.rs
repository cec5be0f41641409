//! Run one conversion per unit on a bounded rayon pool and aggregate the results.

use log::{error, info, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::mpsc;

use crate::config::BatchOptions;
use crate::error::{BatchError, ConvertError};
use crate::types::{BatchReport, MaskTask, Shard, UnitOutcome};
use crate::utils::{create_progress_bar, create_thread_pool};

/// Anything the batch runner can schedule.
pub trait BatchUnit: Sync {
    /// Identifier used in logs and in the aggregated error.
    fn unit_id(&self) -> String;
}

impl BatchUnit for Shard {
    fn unit_id(&self) -> String {
        self.name.clone()
    }
}

impl BatchUnit for MaskTask {
    fn unit_id(&self) -> String {
        self.annotation_path.display().to_string()
    }
}

/// Run `convert` once per unit.
///
/// Every unit is spawned on the pool up front. The calling thread receives exactly
/// one message per unit, advancing the progress bar for each, and only returns once
/// all units are accounted for. All failures are collected with their unit ids.
/// With `fail_fast`, units that have not started when a failure is observed are
/// skipped and reported as cancelled; running units are left to finish.
pub fn run_batch<T, F>(
    units: &[T],
    options: &BatchOptions,
    label: &str,
    convert: F,
) -> Result<BatchReport, BatchError>
where
    T: BatchUnit,
    F: Fn(&T) -> Result<(), ConvertError> + Sync,
{
    let pool = create_thread_pool(options.workers).map_err(|e| BatchError {
        failures: vec![(
            label.to_string(),
            ConvertError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other(e.to_string()),
            },
        )],
        report: BatchReport::default(),
    })?;
    info!(
        "Processing {} units on {} worker threads",
        units.len(),
        pool.current_num_threads()
    );

    let pb = create_progress_bar(units.len() as u64, label);
    let failed = AtomicBool::new(false);
    let mut report = BatchReport::default();
    let mut failures = Vec::new();

    pool.in_place_scope(|scope| {
        let (tx, rx) = mpsc::channel::<(String, Option<Result<(), ConvertError>>)>();
        for unit in units {
            let tx = tx.clone();
            let convert = &convert;
            let failed = &failed;
            scope.spawn(move |_| {
                let id = unit.unit_id();
                if options.fail_fast && failed.load(Relaxed) {
                    let _ = tx.send((id, None));
                    return;
                }
                let result = catch_unwind(AssertUnwindSafe(|| convert(unit)))
                    .unwrap_or_else(|panic| Err(ConvertError::Panicked(panic_message(&*panic))));
                if result.is_err() {
                    failed.store(true, Relaxed);
                }
                let _ = tx.send((id, Some(result)));
            });
        }
        drop(tx);

        for (id, result) in rx {
            let outcome = match result {
                Some(Ok(())) => UnitOutcome::Succeeded,
                Some(Err(e)) => {
                    error!("Failed to process {}: {}", id, e);
                    failures.push((id.clone(), e));
                    UnitOutcome::Failed
                }
                None => {
                    warn!("Skipped {} after an earlier failure", id);
                    UnitOutcome::Cancelled
                }
            };
            report.outcomes.push((id, outcome));
            pb.inc(1);
        }
    });

    pb.finish_with_message(format!("{} processing complete", label));
    report.print_summary();

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(BatchError { failures, report })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
