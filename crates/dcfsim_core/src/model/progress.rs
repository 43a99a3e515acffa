use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Side channel for run progress. Has no effect on results.
pub trait Progress: Sync {
    fn report(&self, completed: usize, total: usize);
}

impl<F> Progress for F
where
    F: Fn(usize, usize) + Sync,
{
    fn report(&self, completed: usize, total: usize) {
        self(completed, total);
    }
}

/// Progress tracking backed by shared atomics, cloneable across threads
#[derive(Debug, Clone, Default)]
pub struct SimulationProgress {
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl SimulationProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from existing atomics (for UI integration)
    #[must_use]
    pub fn from_atomics(completed: Arc<AtomicUsize>, total: Arc<AtomicUsize>) -> Self {
        Self { completed, total }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed fraction in [0, 1]; zero before the first report
    #[must_use]
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.completed() as f64 / total as f64
        }
    }

    pub fn reset(&self) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
    }
}

impl Progress for SimulationProgress {
    fn report(&self, completed: usize, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.completed.fetch_max(completed, Ordering::Relaxed);
    }
}
