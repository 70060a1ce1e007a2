use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project::pin_project;
use tokio::task::JoinHandle;

use crate::error::ApiError;

/// Handle to an async dispatch that is already running.
///
/// Awaiting it yields the dispatch result. Dropping it detaches the
/// dispatch, which still runs to completion, cache side effects included.
#[must_use = "dropping the handle detaches the dispatch; it keeps running"]
#[pin_project]
#[derive(Debug)]
pub struct DispatchHandle<Res, E> {
    #[pin]
    task: JoinHandle<Result<Res, ApiError<E>>>,
}

impl<Res, E> DispatchHandle<Res, E> {
    pub(crate) fn new(task: JoinHandle<Result<Res, ApiError<E>>>) -> Self {
        DispatchHandle { task }
    }

    /// Returns `true` once the dispatch has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<Res, E> Future for DispatchHandle<Res, E> {
    type Output = Result<Res, ApiError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match ready!(this.task.poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(err) => Poll::Ready(Err(ApiError::TaskFailed(err))),
        }
    }
}
