//! Parallel compilation of stale source files.
//!
//! One pass works like this:
//!
//! 1. N scoped worker threads start and poll a shared queue.
//! 2. The calling thread judges every candidate and enqueues the stale ones,
//!    then marks the input complete.
//! 3. Each worker drains a batch of `ceil(queued / (N * 1.3))` files, hands
//!    it to the compiler in one call and records the result. Workers stop
//!    when the input is complete and the queue is empty, or on abort.
//! 4. The calling thread waits on a condition variable until every worker
//!    has stopped or one of them has failed. The first failure sets the
//!    abort flag and becomes the error of the whole pass.
//!
//! In-flight compiler processes are never killed; abort is observed at the
//! next batch boundary.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::builder::batch::batch_size;
use crate::builder::errors::BuildError;
use crate::builder::toolchain::Compiler;
use crate::core::source_file::SourceFile;
use crate::util::fs::ensure_dir;

const IDLE_WAIT: Duration = Duration::from_millis(2);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Worker count to use when none is configured.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[derive(Default)]
struct Progress {
    finished: usize,
    error: Option<BuildError>,
}

/// Shared state of one compile pass.
struct JobSet {
    queue: Mutex<VecDeque<SourceFile>>,
    capacity: usize,
    output: Mutex<Vec<SourceFile>>,
    input_complete: AtomicBool,
    abort: AtomicBool,
    progress: Mutex<Progress>,
    changed: Condvar,
}

impl JobSet {
    fn new(capacity: usize) -> Self {
        JobSet {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            output: Mutex::new(Vec::with_capacity(capacity)),
            input_complete: AtomicBool::new(false),
            abort: AtomicBool::new(false),
            progress: Mutex::new(Progress::default()),
            changed: Condvar::new(),
        }
    }

    fn push(&self, file: SourceFile) -> Result<(), BuildError> {
        let mut queue = lock(&self.queue);
        if queue.len() >= self.capacity {
            return Err(BuildError::QueueFull {
                file: file.source().to_path_buf(),
            });
        }
        queue.push_back(file);
        Ok(())
    }

    fn finish_input(&self) {
        self.input_complete.store(true, Ordering::SeqCst);
    }

    fn request_abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    /// Next batch for a worker; `None` once the worker should stop.
    fn take_batch(&self, workers: usize) -> Option<Vec<SourceFile>> {
        if self.abort.load(Ordering::SeqCst) {
            return None;
        }
        // Read the flag before the queue: once set, nothing more is pushed.
        let complete = self.input_complete.load(Ordering::SeqCst);
        let mut queue = lock(&self.queue);
        if complete && queue.is_empty() {
            return None;
        }
        let n = batch_size(queue.len(), workers);
        Some(queue.drain(..n).collect())
    }

    fn record_error(&self, error: BuildError) {
        let mut progress = lock(&self.progress);
        if progress.error.is_none() {
            progress.error = Some(error);
        }
        self.changed.notify_all();
    }

    fn worker_finished(&self) {
        lock(&self.progress).finished += 1;
        self.changed.notify_all();
    }
}

/// Counts a worker as finished when it stops, including by panic.
struct WorkerGuard<'a>(&'a JobSet);

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.request_abort();
        }
        self.0.worker_finished();
    }
}

/// Runs a compile pass for one target.
pub struct CompilationOverseer<'a> {
    compiler: &'a dyn Compiler,
    workers: usize,
}

impl<'a> CompilationOverseer<'a> {
    pub fn new(compiler: &'a dyn Compiler, workers: Option<usize>) -> Self {
        CompilationOverseer {
            compiler,
            workers: workers.filter(|n| *n > 0).unwrap_or_else(default_workers),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Compile every stale file among `candidates`, returning the ones that
    /// were compiled. Order is unspecified.
    pub fn compile(
        &self,
        candidates: &[SourceFile],
        obj_dir: &Path,
    ) -> Result<Vec<SourceFile>, BuildError> {
        let target = self.compiler.target();
        if candidates.is_empty() {
            tracing::info!("{}: no native code files to compile", target);
            return Ok(Vec::new());
        }

        ensure_dir(obj_dir)?;

        let jobs = JobSet::new(candidates.len());
        let workers = self.workers;

        let outcome = thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| self.work(&jobs));
            }

            let produced = self.produce(&jobs, candidates);
            jobs.finish_input();
            if produced.is_err() {
                jobs.request_abort();
            }

            let mut progress = lock(&jobs.progress);
            while progress.finished < workers && progress.error.is_none() {
                progress = jobs
                    .changed
                    .wait(progress)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if progress.error.is_some() {
                jobs.request_abort();
                while progress.finished < workers {
                    progress = jobs
                        .changed
                        .wait(progress)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }

            produced?;
            match progress.error.take() {
                Some(e) => Err(BuildError::CompilationAborted(Box::new(e))),
                None => Ok(()),
            }
        });
        outcome?;

        let compiled = jobs
            .output
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        tracing::info!("{}: {} files compiled", target, compiled.len());
        Ok(compiled)
    }

    fn produce(&self, jobs: &JobSet, candidates: &[SourceFile]) -> Result<(), BuildError> {
        for file in candidates {
            if self.compiler.needs_compilation(file)? {
                jobs.push(file.clone())?;
            } else {
                tracing::debug!("{} is up to date", file);
            }
        }
        Ok(())
    }

    fn work(&self, jobs: &JobSet) {
        let _guard = WorkerGuard(jobs);
        while let Some(batch) = jobs.take_batch(self.workers) {
            if batch.is_empty() {
                thread::sleep(IDLE_WAIT);
                continue;
            }

            tracing::debug!("Compiling batch of {} files", batch.len());
            match self.compiler.compile(&batch) {
                Ok(()) => lock(&jobs.output).extend(batch),
                Err(e) => {
                    jobs.record_error(e);
                    break;
                }
            }
        }
    }
}
