//! Bounded fan-out shared by the scrape and import phases.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Run `work` over `jobs` with at most `concurrency` tasks in flight.
///
/// A permit is taken before each spawn and released when the task ends, so a
/// new job starts as soon as any running one finishes. `on_done` runs on the
/// calling task for every finished job with the job's position in `jobs`, and
/// `None` in place of the output if the task panicked.
///
/// Once `cancel` fires no further jobs are spawned; jobs already running are
/// awaited. Returns `true` if jobs were left undispatched.
pub(crate) async fn run_bounded<J, T, F, Fut>(
    jobs: Vec<J>,
    concurrency: usize,
    cancel: &CancellationToken,
    mut work: F,
    mut on_done: impl FnMut(usize, Option<T>),
) -> bool
where
    J: Send + 'static,
    T: Send + 'static,
    F: FnMut(J) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut spawned = HashMap::new();
    let mut queue = jobs.into_iter().enumerate();
    let mut next = queue.next();
    let mut cancelled = false;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled(), if next.is_some() && !cancelled => {
                debug!("cancellation requested, no further dispatch");
                cancelled = true;
            }

            Some(joined) = tasks.join_next(), if !tasks.is_empty() => match joined {
                Ok((index, output)) => on_done(index, Some(output)),
                Err(e) => match spawned.get(&e.id()) {
                    Some(&index) => {
                        warn!(index, error = %e, "worker task failed");
                        on_done(index, None);
                    }
                    None => warn!(error = %e, "untracked worker task failed"),
                },
            },

            permit = semaphore.clone().acquire_owned(), if next.is_some() && !cancelled => {
                // The semaphore is never closed.
                let Ok(permit) = permit else { break };
                if let Some((index, job)) = next.take() {
                    let fut = work(job);
                    let handle = tasks.spawn(async move {
                        let _permit = permit;
                        (index, fut.await)
                    });
                    spawned.insert(handle.id(), index);
                }
                next = queue.next();
            }

            else => break,
        }
    }

    cancelled
}
