use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// A deferred load result.
///
/// Returned by [DataLoader::defer_one](super::DataLoader::defer_one): interest
/// in the key is registered synchronously, awaiting the thunk blocks until the
/// owning batch completes. A cache hit produces a thunk that resolves on the
/// first poll.
pub struct Thunk<V, E> {
    rx: oneshot::Receiver<Result<V, E>>,
}

impl<V, E> Thunk<V, E> {
    pub(crate) fn ready(result: Result<V, E>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Thunk { rx }
    }

    pub(crate) fn pending(rx: oneshot::Receiver<Result<V, E>>) -> Self {
        Thunk { rx }
    }
}

impl<V, E> Future for Thunk<V, E> {
    type Output = Result<V, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the batch task died before distributing
        // results, e.g. on runtime shutdown.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Error::BatchAbandoned)))
    }
}
