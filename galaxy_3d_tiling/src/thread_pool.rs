//! Fixed-size worker pool for per-frame jobs
//!
//! Wraps a dedicated rayon pool (not the global one) so the scene controls
//! exactly how many threads take part in visibility updates. Jobs are scoped:
//! they may borrow data owned by the caller, and `run_jobs` returns only after
//! every job has finished.

use crate::error::{Error, Result};

/// Worker pool with a fixed number of threads
pub struct ThreadPool {
    pool: rayon::ThreadPool,
    num_threads: usize,
}

impl ThreadPool {
    /// Create a pool of `num_threads` threads.
    ///
    /// # Errors
    ///
    /// - `InvalidConfiguration` if `num_threads` is 0
    /// - `InitializationFailed` if the OS refuses to spawn the threads
    pub fn new(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            crate::engine_error!("galaxy3d::ThreadPool", "Thread pool needs at least one thread");
            return Err(Error::InvalidConfiguration(
                "thread pool needs at least one thread".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("galaxy3d-tiles-{}", index))
            .build()
            .map_err(|e| {
                crate::engine_error!("galaxy3d::ThreadPool", "Failed to spawn {} threads: {}", num_threads, e);
                Error::InitializationFailed(format!("thread pool: {}", e))
            })?;

        crate::engine_debug!("galaxy3d::ThreadPool", "Started {} worker threads", num_threads);

        Ok(Self { pool, num_threads })
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Run one job per input and block until all of them complete.
    ///
    /// `job` receives the input's position in `jobs` along with the input.
    /// Results come back in the same order as the inputs. A panic in any job
    /// is propagated to the caller once the others have finished.
    pub fn run_jobs<T, R, F>(&self, jobs: Vec<T>, job: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> R + Sync,
    {
        let mut results: Vec<Option<R>> = Vec::with_capacity(jobs.len());
        results.resize_with(jobs.len(), || None);

        let job = &job;
        self.pool.scope(|scope| {
            for ((index, input), slot) in jobs.into_iter().enumerate().zip(results.iter_mut()) {
                scope.spawn(move |_| {
                    *slot = Some(job(index, input));
                });
            }
        });

        results.into_iter().flatten().collect()
    }
}

#[cfg(test)]
#[path = "thread_pool_tests.rs"]
mod tests;
