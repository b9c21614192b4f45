//! Run orchestration
//!
//! A run checks its inputs, loads the policy, discovers the combinations and
//! then processes one *unit* per (combination, target file) pair on a fixed
//! pool of scoped worker threads. Workers share the read-only policy and a
//! `SourceCache`; each unit owns its target object.
//!
//! # Failure handling
//!
//! Input and policy problems abort the run before any unit starts. Unit
//! failures are logged and collected; by default every other unit still runs
//! and the run ends with `UnitsFailed`. `FailureMode::FailFast` stops handing
//! out units after the first failure.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogValidator, CommandValidator, JsonDocumentCheck, check_catalog_inputs};
use crate::config::{FailureMode, RunConfig};
use crate::discovery::enumerate_combinations;
use crate::engine::assemble_target;
use crate::error::{AdapterError, InputKind, Result};
use crate::policy::{self, TargetSpec};
use crate::source_cache::{SourceCache, SourceLookup};
use crate::types::Combination;
use crate::writer::write_target;

/// One target file for one combination
#[derive(Debug, Clone)]
pub struct Unit<'p> {
    pub target_file: &'p str,
    pub spec: &'p TargetSpec,
    pub combination: Combination,
}

/// Result of a unit that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Written(PathBuf),
    /// Conditions excluded the combination, or the target had no roles
    Skipped,
}

/// What a successful run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub combinations: usize,
    pub units: usize,
    /// Written files, in unit order
    pub written: Vec<PathBuf>,
    pub skipped: usize,
}

/// Run the adapter with the validator selected by `config`
pub fn generate(config: &RunConfig) -> Result<RunSummary> {
    match &config.catalog_validator {
        Some(command) => generate_with_validator(config, &CommandValidator::new(command)?),
        None => generate_with_validator(config, &JsonDocumentCheck),
    }
}

/// Run the adapter with a caller-supplied catalog validator.
///
/// # Errors
///
/// - `InputNotFound` for a missing catalog, schema, input directory or policy
/// - `Catalog` when the validator rejects the catalog
/// - `Policy` when the policy is malformed
/// - `UnitsFailed` when at least one unit failed
pub fn generate_with_validator(
    config: &RunConfig,
    validator: &dyn CatalogValidator,
) -> Result<RunSummary> {
    if config.jobs == Some(0) {
        return Err(AdapterError::config("worker count must be at least 1"));
    }

    check_catalog_inputs(&config.catalog, &config.schema)?;
    if config.skip_catalog_check {
        debug!("Catalog validation skipped");
    } else {
        validator.validate(&config.catalog, &config.schema)?;
    }

    if !config.input_dir.is_dir() {
        return Err(AdapterError::input_not_found(InputKind::InputDirectory, &config.input_dir));
    }
    let policy = policy::resolve(&config.policy)?;

    info!("Input directory: {}", config.input_dir.display());
    info!("Output directory: {}", config.output_dir.display());

    let combinations = enumerate_combinations(&config.input_dir)?;
    if combinations.is_empty() {
        warn!("No combinations found under input directory: {}", config.input_dir.display());
    }

    let mut units = Vec::with_capacity(combinations.len() * policy.targets.len());
    for combination in &combinations {
        info!("Processing: {combination}");
        for (target_file, spec) in &policy.targets {
            units.push(Unit {
                target_file,
                spec,
                combination: combination.clone(),
            });
        }
    }

    let cache = SourceCache::new(&config.input_dir);
    let workers = config.worker_count();
    debug!("Running {} unit(s) on {} worker(s)", units.len(), workers);

    let results = run_pool(&units, workers, config.failure_mode, |unit| {
        run_unit(unit, &cache, &config.output_dir)
    });

    let mut summary = RunSummary {
        combinations: combinations.len(),
        units: units.len(),
        ..RunSummary::default()
    };
    let mut failures = Vec::new();
    for (_, result) in results {
        match result {
            Ok(UnitOutcome::Written(path)) => summary.written.push(path),
            Ok(UnitOutcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                error!("{e}");
                failures.push(e);
            }
        }
    }

    let failed = failures.len();
    let only_missing_inputs = failures.iter().all(AdapterError::is_input_not_found);
    if let Some(first) = failures.into_iter().next() {
        return Err(AdapterError::UnitsFailed {
            failed,
            total: units.len(),
            only_missing_inputs,
            first: Box::new(first),
        });
    }

    info!(
        "Adapter config generation completed: {} file(s) written, {} skipped, {} source file(s) read",
        summary.written.len(),
        summary.skipped,
        cache.len()
    );
    Ok(summary)
}

/// Generate target files for `catalog` with the default input directory and
/// policy, writing under `output_root`.
///
/// When `log_file` is given, logging is set up to write there first.
pub fn generate_from_catalog(
    catalog: &Path,
    schema: &Path,
    output_root: &Path,
    log_file: Option<&Path>,
) -> Result<RunSummary> {
    let config = RunConfig {
        schema: schema.to_path_buf(),
        output_dir: output_root.to_path_buf(),
        log_file: log_file.map(Path::to_path_buf),
        ..RunConfig::new(catalog)
    };
    if let Some(path) = &config.log_file {
        crate::logging::init(config.log_level, Some(path))
            .map_err(|e| AdapterError::config(format!("{e:#}")))?;
    }
    generate(&config)
}

/// Assemble and write one unit. Errors carry the unit's identity.
pub fn run_unit(unit: &Unit<'_>, sources: &dyn SourceLookup, output_root: &Path) -> Result<UnitOutcome> {
    let wrap = |e| AdapterError::unit(unit.target_file, &unit.combination, e);

    let Some(target) = assemble_target(unit.target_file, unit.spec, &unit.combination, sources)
        .map_err(wrap)?
    else {
        return Ok(UnitOutcome::Skipped);
    };
    if target.is_empty() {
        debug!("{} for {} has no roles, not written", unit.target_file, unit.combination);
        return Ok(UnitOutcome::Skipped);
    }

    write_target(output_root, &unit.combination, unit.target_file, &target)
        .map(UnitOutcome::Written)
        .map_err(wrap)
}

/// Run `work` over `items` on `workers` scoped threads.
///
/// Results come back as `(index, result)` sorted by index. In fail-fast mode
/// items not yet started when a failure is seen are never run and have no
/// result.
fn run_pool<T, R, F>(items: &[T], workers: usize, mode: FailureMode, work: F) -> Vec<(usize, Result<R>)>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel();

    thread::scope(|s| {
        for _ in 0..workers.clamp(1, items.len().max(1)) {
            let tx = tx.clone();
            let (next, stop, work) = (&next, &stop, &work);
            s.spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    let index = next.fetch_add(1, Ordering::AcqRel);
                    let Some(item) = items.get(index) else {
                        break;
                    };
                    let result = work(item);
                    if result.is_err() && mode == FailureMode::FailFast {
                        stop.store(true, Ordering::Release);
                    }
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let mut results: Vec<_> = rx.into_iter().collect();
    results.sort_by_key(|(index, _)| *index);
    results
}
