//! Work handed back to the frame loop from other threads.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::Engine;

type Job = Box<dyn FnOnce(&mut Engine) + Send>;

/// Jobs run on the next [`Engine::tick`], in push order.
#[derive(Clone, Default)]
pub struct MainThreadQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl MainThreadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job: impl FnOnce(&mut Engine) + Send + 'static) {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Box::new(job));
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every queued job. Jobs pushed while these run wait for the next drain.
    pub(crate) fn drain(&self) -> Vec<Job> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}
