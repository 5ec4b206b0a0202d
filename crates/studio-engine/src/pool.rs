use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::PipelineError;

pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 8;

/// Runs blocking remote calls on tokio's blocking threads, at most
/// `max_concurrent` at a time. Callers wait for a permit first; the permit
/// is released when the job returns, not when the caller stops waiting.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Default for BlockingPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_CALLS)
    }
}

impl BlockingPool {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn run<F, T>(&self, job: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Worker("blocking pool closed".to_string()))?;
        // The permit lives as long as the job, even if the caller goes away.
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|err| PipelineError::Worker(err.to_string()))
    }
}
