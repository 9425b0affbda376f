use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, Instrument, Span};

/// Output of one worker launched by [`WorkerRunner::run_staggered`].
#[derive(Debug)]
pub struct WorkerReport<T> {
    /// Launch position, `0..count`.
    pub index: usize,
    /// Offset of the actual spawn from the start of the run.
    pub launched_after: Duration,
    /// The worker's value, or the panic/abort message if the task did not finish.
    pub output: Result<T, String>,
}

pub struct WorkerRunner;

impl WorkerRunner {
    /// Spawns `count` workers, worker `i` no earlier than `i * stagger` after the
    /// start, and waits for all of them.
    ///
    /// Workers run concurrently once spawned. Reports come back in launch order,
    /// not completion order.
    pub async fn run_staggered<T, F, Fut>(
        count: usize,
        stagger: Duration,
        mut make_worker: F,
    ) -> Vec<WorkerReport<T>>
    where
        F: FnMut(usize) -> (Fut, Span),
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let start = Instant::now();
        let mut handles = Vec::with_capacity(count);

        for i in 0..count {
            // Offset from the run start so sleeps never accumulate drift.
            // An unreachable offset just sleeps forever.
            if i > 0 {
                let offset = stagger.saturating_mul(i as u32);
                tokio::time::sleep(offset.saturating_sub(start.elapsed())).await;
            }

            let (worker, span) = make_worker(i);
            let launched_after = start.elapsed();
            handles.push((launched_after, tokio::spawn(worker.instrument(span))));
        }

        let mut reports = Vec::with_capacity(count);
        for (index, (launched_after, handle)) in handles.into_iter().enumerate() {
            let output = match handle.await {
                Ok(value) => Ok(value),
                Err(e) => {
                    error!("Worker {} panicked or failed to join: {:?}", index, e);
                    Err(e.to_string())
                }
            };
            reports.push(WorkerReport {
                index,
                launched_after,
                output,
            });
        }

        reports
    }
}
