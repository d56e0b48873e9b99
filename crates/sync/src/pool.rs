use futures::stream::{self, StreamExt};
use std::future::Future;

/// Result of a settle-all join: every unit of work ran to completion, and
/// outcomes are partitioned rather than short-circuited.
#[derive(Debug)]
pub struct Settled<T, E> {
    pub succeeded: Vec<T>,
    pub failed: Vec<E>,
}

/// Run `work` over `items` with at most `limit` futures in flight.
///
/// One item's failure neither cancels nor affects its siblings; completion
/// order is not preserved. The bound exists because each worker issues
/// lookups against the target store, and unbounded fan-out saturates the
/// connection pool.
pub async fn settle_all<I, T, E, F, Fut>(items: I, limit: usize, work: F) -> Settled<T, E>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let results: Vec<Result<T, E>> = stream::iter(items.into_iter().map(work))
        .buffer_unordered(limit.max(1))
        .collect()
        .await;

    let mut settled = Settled {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for result in results {
        match result {
            Ok(value) => settled.succeeded.push(value),
            Err(error) => settled.failed.push(error),
        }
    }
    settled
}
