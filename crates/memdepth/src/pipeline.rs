//! Corpus scheduler.
//!
//! A run moves source directories through three bounded queues:
//!
//! ```text
//! feeder ──paths──▶ parse workers ──parsed──▶ analyze workers ──done──▶ main thread
//!                   (rayon pool)              (one Session each)       (completed log)
//! ```
//!
//! A full queue blocks its producers, so memory stays bounded however large
//! the corpus is. Each downstream queue is closed by a [`StageCloser`] once
//! every producer of its stage has finished.
//!
//! The unit of progress is a whole directory. It is appended to the completed
//! log only after every unit in it was written, and a later run skips it.
//!
//! A mode made of several phases (see [`AnalysisMode::phases`]) runs them one
//! after another over the whole corpus, each with its own log. Depth rows
//! resolve package members to variables written by other directories, so
//! every definition must exist before the first depth row does.
//! Directories the front end cannot load are reported in
//! [`RunStats::errors`] and left out of the log so a later run retries them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::analyzer::analyze_unit;
use crate::completed_log::CompletedLog;
use crate::config::Config;
use crate::context::AnalysisContext;
use crate::error::{Error, Result, UnitError};
use crate::frontend::FrontEnd;
use crate::syntax::ParsedUnit;
use crate::types::{AnalysisMode, RunStats};

/// Closes a queue once every producer feeding it has finished.
///
/// The closer holds the only original sender. Each producer works through a
/// [`Producer`] that owns a clone; dropping the producer drops the clone and
/// counts the producer as finished. When the count reaches the total given
/// at construction the original sender is dropped and consumers see the
/// queue disconnect after draining it.
#[derive(Debug)]
pub struct StageCloser<T> {
    stage: &'static str,
    sender: Mutex<Option<Sender<T>>>,
    finished: AtomicUsize,
    producers: usize,
}

impl<T> StageCloser<T> {
    /// Take ownership of `sender` for a stage with `producers` producers.
    ///
    /// A stage with no producers is closed immediately.
    #[must_use]
    pub fn new(stage: &'static str, sender: Sender<T>, producers: usize) -> Self {
        let closer = Self {
            stage,
            sender: Mutex::new(Some(sender)),
            finished: AtomicUsize::new(0),
            producers,
        };
        if producers == 0 {
            closer.close();
        }
        closer
    }

    /// Register one producer.
    ///
    /// Call this exactly as many times as the producer total. The returned
    /// guard signals completion when dropped, including during unwinding.
    #[must_use]
    pub fn producer(&self) -> Producer<'_, T> {
        Producer {
            sender: self.sender.lock().clone(),
            closer: self,
        }
    }

    /// Record that one producer is done; returns `true` if this closed the stage.
    pub fn producer_done(&self) -> bool {
        let finished = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
        if finished == self.producers {
            self.close();
            return true;
        }
        false
    }

    /// Whether the original sender has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    fn close(&self) {
        self.sender.lock().take();
        debug!(stage = self.stage, producers = self.producers, "Stage closed");
    }
}

/// One producer's handle on a stage.
#[derive(Debug)]
pub struct Producer<'c, T> {
    sender: Option<Sender<T>>,
    closer: &'c StageCloser<T>,
}

impl<T> Producer<'_, T> {
    /// Send downstream, blocking while the queue is full.
    ///
    /// Returns `false` when every consumer is gone.
    pub fn send(&self, value: T) -> bool {
        self.sender
            .as_ref()
            .is_some_and(|sender| sender.send(value).is_ok())
    }
}

impl<T> Drop for Producer<'_, T> {
    fn drop(&mut self) {
        self.sender.take();
        self.closer.producer_done();
    }
}

/// Directory names never descended into.
fn is_excluded_dir(name: &str) -> bool {
    matches!(
        name,
        "test" | "vendor" | "_obj" | "build" | "bin" | "testdata" | "_testdata"
    ) || name.ends_with("_test")
        || name.starts_with('.')
}

/// Every directory under `root` that directly contains a `.go` file, sorted.
///
/// Excluded directory names prune their whole subtree. Unreadable
/// directories are logged and skipped.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "corpus-root {} is not a directory",
            root.display()
        )));
    }
    let mut dirs = Vec::new();
    walk_dir(root, &mut dirs);
    dirs.sort();
    debug!(root = %root.display(), directories = dirs.len(), "Discovered source directories");
    Ok(dirs)
}

fn walk_dir(dir: &Path, dirs: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Failed to read directory");
            return;
        }
    };

    let mut has_go = false;
    let mut children = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_excluded_dir);
            if !excluded {
                children.push(path);
            }
        } else if file_type.is_file() && path.extension().is_some_and(|ext| ext == "go") {
            has_go = true;
        }
    }

    if has_go {
        dirs.push(dir.to_path_buf());
    }
    for child in children {
        walk_dir(&child, dirs);
    }
}

/// A directory as it leaves the parse stage.
struct ParsedDir {
    dir: PathBuf,
    loaded: Result<Vec<ParsedUnit>>,
}

/// A directory as it leaves the analyze stage.
enum Outcome {
    Completed {
        dir: PathBuf,
        units: usize,
        errors: Vec<UnitError>,
    },
    Skipped(UnitError),
}

/// What one phase achieved.
#[derive(Default)]
struct PhaseReport {
    /// Candidates logged before or during the phase, sorted
    finished: Vec<PathBuf>,
    skipped_done: usize,
    completed: usize,
    units: usize,
    errors: Vec<UnitError>,
}

/// Abort flag plus the first fatal error.
#[derive(Default)]
struct Abort {
    raised: AtomicBool,
    first: Mutex<Option<Error>>,
}

impl Abort {
    fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    fn raise(&self, err: Error) {
        error!(error = %err, "Fatal error, aborting run");
        let mut first = self.first.lock();
        if first.is_none() {
            *first = Some(err);
        }
        self.raised.store(true, Ordering::Release);
    }

    fn take(&self) -> Option<Error> {
        self.first.lock().take()
    }
}

/// Runs one analysis mode over a corpus.
pub struct Pipeline {
    config: Config,
    mode: AnalysisMode,
    front_end: Box<dyn FrontEnd>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a pipeline; nothing is opened until [`Pipeline::run`].
    #[must_use]
    pub fn new(config: Config, mode: AnalysisMode, front_end: Box<dyn FrontEnd>) -> Self {
        Self {
            config,
            mode,
            front_end,
        }
    }

    /// The configuration this pipeline runs with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Completed-log files of this pipeline's phases, in run order.
    #[must_use]
    pub fn log_paths(&self) -> Vec<PathBuf> {
        self.mode
            .phases()
            .iter()
            .map(|phase| self.phase_log_path(*phase))
            .collect()
    }

    fn phase_log_path(&self, phase: AnalysisMode) -> PathBuf {
        self.config.log_dir().join(phase.log_file_name())
    }

    /// Validate the configuration, open the database and run.
    pub fn run(&self) -> Result<RunStats> {
        self.config.validate()?;
        let ctx = AnalysisContext::from_config(&self.config)?;
        self.run_with(&ctx)
    }

    /// Run against an already-open context.
    ///
    /// Each phase covers the whole corpus before the next one starts, and a
    /// later phase only sees directories every earlier phase finished. The
    /// returned counts describe the last phase; errors are collected from
    /// all of them.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error (storage failure, log write failure or
    /// worker panic). Directories completed before it stay in the log.
    pub fn run_with(&self, ctx: &AnalysisContext) -> Result<RunStats> {
        let started = Instant::now();
        let discovered = discover(&self.config.corpus_root)?;
        let mut stats = RunStats {
            directories_total: discovered.len(),
            ..RunStats::default()
        };

        let mut candidates = discovered;
        for &phase in self.mode.phases() {
            let report = self.run_phase(ctx, phase, candidates)?;
            stats.directories_skipped_done = report.skipped_done;
            stats.directories_completed = report.completed;
            stats.units_analyzed = report.units;
            for err in report.errors {
                let seen = stats
                    .errors
                    .iter()
                    .any(|e| e.path == err.path && e.message == err.message);
                if !seen {
                    stats.errors.push(err);
                }
            }
            candidates = report.finished;
        }

        stats.duration = started.elapsed();
        info!(
            mode = %self.mode,
            completed = stats.directories_completed,
            units = stats.units_analyzed,
            errors = stats.errors.len(),
            duration_ms = stats.duration.as_millis(),
            "Run finished"
        );
        Ok(stats)
    }

    /// One corpus-wide pass of `phase` over `candidates`.
    fn run_phase(
        &self,
        ctx: &AnalysisContext,
        phase: AnalysisMode,
        candidates: Vec<PathBuf>,
    ) -> Result<PhaseReport> {
        let log_path = self.phase_log_path(phase);
        let done = CompletedLog::read(&log_path)?;
        let mut log = CompletedLog::open(&log_path)?;

        let (finished, pending): (Vec<PathBuf>, Vec<PathBuf>) =
            candidates.into_iter().partition(|dir| done.contains(dir));
        let mut report = PhaseReport {
            skipped_done: finished.len(),
            finished,
            ..PhaseReport::default()
        };

        let parse_workers = self.config.parse_workers();
        let write_workers = self.config.write_workers();
        info!(
            phase = %phase,
            pending = pending.len(),
            skipped = report.skipped_done,
            parse_workers,
            write_workers,
            "Starting phase"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parse_workers)
            .thread_name(|i| format!("memdepth-parse-{i}"))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build parse pool: {e}")))?;

        let capacity = self.config.queue_capacity;
        let (path_tx, path_rx) = bounded::<PathBuf>(capacity);
        let (parsed_tx, parsed_rx) = bounded::<ParsedDir>(capacity);
        let (done_tx, done_rx) = bounded::<Outcome>(capacity);
        let parsed_stage = StageCloser::new("parse", parsed_tx, parse_workers);
        let done_stage = StageCloser::new("analyze", done_tx, write_workers);
        let abort = Abort::default();
        let abort = &abort;
        let (pool, parsed_stage, done_stage) = (&pool, &parsed_stage, &done_stage);
        let front_end = self.front_end.as_ref();

        let joined = thread::scope(|s| {
            let feeder = s.spawn(move || feed(pending, path_tx, abort));

            let parse = s.spawn(move || {
                pool.scope(|scope| {
                    for _ in 0..parse_workers {
                        let paths = path_rx.clone();
                        let out = parsed_stage.producer();
                        scope.spawn(move |_| parse_worker(front_end, phase, &paths, &out, abort));
                    }
                });
            });

            let analyzers: Vec<_> = (0..write_workers)
                .map(|i| {
                    let parsed = parsed_rx.clone();
                    let out = done_stage.producer();
                    thread::Builder::new()
                        .name(format!("memdepth-analyze-{i}"))
                        .spawn_scoped(s, move || analyze_worker(ctx, phase, &parsed, &out, abort))
                })
                .collect();

            // Only the workers' clones may keep the parsed queue open.
            drop(parsed_rx);

            for outcome in &done_rx {
                match outcome {
                    Outcome::Completed { dir, units, errors } => {
                        if abort.is_raised() {
                            continue;
                        }
                        if let Err(e) = log.append(&dir) {
                            abort.raise(e);
                            continue;
                        }
                        report.completed += 1;
                        report.units += units;
                        report.errors.extend(errors);
                        report.finished.push(dir);
                    }
                    Outcome::Skipped(err) => report.errors.push(err),
                }
            }

            let mut panics = Vec::new();
            if let Err(payload) = feeder.join() {
                panics.push(("feeder", panic_message(payload.as_ref())));
            }
            if let Err(payload) = parse.join() {
                panics.push(("parse", panic_message(payload.as_ref())));
            }
            for handle in analyzers {
                match handle {
                    Ok(handle) => {
                        if let Err(payload) = handle.join() {
                            panics.push(("analyze", panic_message(payload.as_ref())));
                        }
                    }
                    Err(e) => abort.raise(Error::Io(e)),
                }
            }
            panics
        });

        if let Some((stage, message)) = joined.into_iter().next() {
            error!(stage, message = %message, "Worker panicked");
            return Err(Error::Internal(format!("{stage} worker panicked: {message}")));
        }
        if let Some(err) = abort.take() {
            return Err(err);
        }

        report.finished.sort();
        info!(
            phase = %phase,
            completed = report.completed,
            errors = report.errors.len(),
            log = %log.path().display(),
            "Phase finished"
        );
        Ok(report)
    }
}

fn feed(pending: Vec<PathBuf>, paths: Sender<PathBuf>, abort: &Abort) {
    for dir in pending {
        if abort.is_raised() || paths.send(dir).is_err() {
            break;
        }
    }
}

fn parse_worker(
    front_end: &dyn FrontEnd,
    mode: AnalysisMode,
    paths: &Receiver<PathBuf>,
    out: &Producer<'_, ParsedDir>,
    abort: &Abort,
) {
    for dir in paths {
        if abort.is_raised() {
            continue;
        }
        let loaded = front_end.load(&dir, mode.load_mode());
        if let Err(e) = &loaded {
            warn!(dir = %dir.display(), error = %e, "Front end failed, skipping directory");
        }
        if !out.send(ParsedDir { dir, loaded }) {
            break;
        }
    }
}

fn analyze_worker(
    ctx: &AnalysisContext,
    mode: AnalysisMode,
    parsed: &Receiver<ParsedDir>,
    out: &Producer<'_, Outcome>,
    abort: &Abort,
) {
    let mut session = match ctx.database().session() {
        Ok(session) => session,
        Err(e) => {
            abort.raise(e);
            return;
        }
    };

    for ParsedDir { dir, loaded } in parsed {
        if abort.is_raised() {
            continue;
        }
        let outcome = match loaded {
            Err(e) => Outcome::Skipped(UnitError::from_load_error(dir, &e)),
            Ok(units) => {
                let mut errors = Vec::new();
                let mut failed = false;
                for unit in &units {
                    match analyze_unit(ctx, &mut session, unit, mode) {
                        Ok(skipped) => errors.extend(skipped),
                        Err(e) => {
                            error!(
                                dir = %dir.display(),
                                package = %unit.package,
                                "Storage failure"
                            );
                            abort.raise(e);
                            failed = true;
                            break;
                        }
                    }
                }
                if failed {
                    continue;
                }
                debug!(dir = %dir.display(), units = units.len(), "Directory analyzed");
                Outcome::Completed {
                    dir,
                    units: units.len(),
                    errors,
                }
            }
        };
        if !out.send(outcome) {
            break;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
