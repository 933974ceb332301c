//! Worker pool the simulation step runs on.
//!
//! The pool has `max(available_parallelism - 1, 0)` threads so the main thread
//! keeps a core. With zero workers the step runs inline on the caller. Either
//! way [`Dispatcher::run`] blocks until the job is done.

use std::num::NonZeroUsize;
use std::thread;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::PhysicsError;

pub struct Dispatcher {
    pool: Option<ThreadPool>,
}

impl Dispatcher {
    pub fn new(workers: usize) -> Result<Self, PhysicsError> {
        if workers == 0 {
            return Ok(Self::inline());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("physics-worker-{i}"))
            .build()
            .map_err(|e| PhysicsError::Foundation(e.to_string()))?;
        Ok(Self { pool: Some(pool) })
    }

    /// A dispatcher without workers. Jobs run on the calling thread.
    pub fn inline() -> Self {
        Self { pool: None }
    }

    pub fn default_worker_count() -> usize {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            .saturating_sub(1)
    }

    pub fn workers(&self) -> usize {
        self.pool
            .as_ref()
            .map(ThreadPool::current_num_threads)
            .unwrap_or(0)
    }

    /// Run `job` on the pool (or inline) and return its result.
    pub fn run<R, F>(&self, job: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(job),
            None => job(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_runs_inline() {
        let dispatcher = Dispatcher::new(0).unwrap();
        assert_eq!(dispatcher.workers(), 0);
        let caller = thread::current().id();
        assert_eq!(dispatcher.run(|| thread::current().id()), caller);
    }

    #[test]
    fn pooled_job_runs_on_worker() {
        let dispatcher = Dispatcher::new(2).unwrap();
        assert_eq!(dispatcher.workers(), 2);
        let name = dispatcher.run(|| thread::current().name().map(str::to_owned));
        assert!(name.unwrap().starts_with("physics-worker-"));
    }

    #[test]
    fn default_worker_count_leaves_a_core() {
        let available = thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1);
        assert_eq!(Dispatcher::default_worker_count(), available - 1);
    }
}
