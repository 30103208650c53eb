//! Batch processing: run many sprites through the pipeline in parallel.
//!
//! Sprites share nothing mutable. The palette and config are read-only,
//! so one worker per sprite is safe and results come back in input
//! order regardless of which finished first. A failing sprite is
//! recorded in its own result and never stops the rest of the batch.

use rayon::prelude::*;
use serde::Serialize;


/// Runs per-sprite work on a bounded worker pool.
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    jobs: usize,
}

impl BatchRunner {
    /// A runner using up to `jobs` workers. Zero means one per
    /// available CPU.
    #[must_use]
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            jobs
        };
        Self { jobs }
    }

    /// Number of workers this runner uses.
    #[must_use]
    pub const fn jobs(&self) -> usize {
        self.jobs
    }

    /// Apply `work` to every item, returning results in input order.
    ///
    /// Falls back to the global rayon pool if a dedicated pool cannot be
    /// built.
    pub fn run<T, R, F>(&self, items: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        if self.jobs <= 1 || items.len() <= 1 {
            return items.into_iter().map(work).collect();
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
        {
            Ok(pool) => pool.install(|| items.into_par_iter().map(&work).collect()),
            Err(e) => {
                log::warn!("could not build a {}-thread pool ({e}); using the global pool", self.jobs);
                items.into_par_iter().map(&work).collect()
            }
        }
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A sprite that failed, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSprite {
    /// The sprite's name.
    pub name: String,
    /// Why it failed.
    pub reason: String,
}

/// Per-batch tally of which sprites succeeded and which failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Names of sprites whose files were all written.
    pub succeeded: Vec<String>,
    /// Sprites that produced no output.
    pub failed: Vec<FailedSprite>,
}

impl BatchReport {
    /// Record a sprite that succeeded.
    pub fn record_success(&mut self, name: impl Into<String>) {
        self.succeeded.push(name.into());
    }

    /// Record a sprite that failed.
    pub fn record_failure(&mut self, name: impl Into<String>, reason: &impl std::fmt::Display) {
        self.failed.push(FailedSprite {
            name: name.into(),
            reason: reason.to_string(),
        });
    }

    /// Returns `true` if no sprite failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total sprites recorded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Format the report for a terminal.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = vec![format!(
            "{} of {} sprites succeeded",
            self.succeeded.len(),
            self.total(),
        )];
        for failed in &self.failed {
            lines.push(format!("  FAILED {}: {}", failed.name, failed.reason));
        }
        lines.join("\n")
    }
}
