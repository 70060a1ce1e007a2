//! Fan-out/join of independent backend operations.
//!
//! Multi-key cache operations issue one sub-operation per key and wait for
//! all of them. There is no atomicity: when some sub-operations fail, the
//! ones that succeeded stay applied and the aggregate error says how many
//! failed.

use std::future::Future;

use futures::future::join_all;

use crate::{BackendError, BackendResult};

/// Runs all `ops` concurrently and waits for every one of them.
///
/// Completion order between the operations is unspecified.
pub async fn join_all_ops<I, F>(ops: I) -> BackendResult<()>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = BackendResult<()>>,
{
    collect_results(join_all(ops).await)
}

/// Folds the results of independent sub-operations into one result.
///
/// A single failure is returned as is; several failures become
/// [`BackendError::PartialWrite`] carrying the first one.
pub fn collect_results<I>(results: I) -> BackendResult<()>
where
    I: IntoIterator<Item = BackendResult<()>>,
{
    let mut total = 0;
    let mut errors = Vec::new();
    for result in results {
        total += 1;
        if let Err(err) = result {
            errors.push(err);
        }
    }

    let failed = errors.len();
    let mut errors = errors.into_iter();
    match errors.next() {
        None => Ok(()),
        Some(first) if total == 1 => Err(first),
        Some(first) => {
            for rest in errors {
                tracing::warn!(error = ?rest, "Cache sub-operation failed");
            }
            Err(BackendError::PartialWrite {
                failed,
                total,
                first: Box::new(first),
            })
        }
    }
}
