use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_channel::oneshot;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;

use super::error::Error;

type Output<V, E> = Result<V, Error<E>>;

/// Future handed out by [DataLoader::load](super::DataLoader::load).
///
/// Cloning is cheap and every clone resolves to the same result. Requests
/// that coalesce on one cache key receive clones of the same future, which
/// [LoadFuture::ptr_eq] can observe.
pub struct LoadFuture<V, E> {
    inner: Shared<BoxFuture<'static, Output<V, E>>>,
}

impl<V, E> LoadFuture<V, E>
where
    V: Send + Sync + Clone + 'static,
    E: Send + Sync + Clone + 'static,
{
    /// A future that is already settled with `result`.
    pub fn ready(result: Output<V, E>) -> Self {
        Self { inner: futures_util::future::ready(result).boxed().shared() }
    }

    /// Returns `true` if both futures resolve from the same result slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    /// Returns the result if it is available right now.
    pub fn try_get(&self) -> Option<Output<V, E>> {
        self.clone().now_or_never()
    }
}

impl<V, E> Clone for LoadFuture<V, E> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<V, E> fmt::Debug for LoadFuture<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadFuture").finish_non_exhaustive()
    }
}

impl<V, E> Future for LoadFuture<V, E>
where
    V: Clone,
    E: Clone,
{
    type Output = Output<V, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().inner.poll_unpin(cx)
    }
}

enum SlotState<V, E> {
    Pending(oneshot::Sender<Output<V, E>>),
    Settled,
}

/// Write side of a [LoadFuture]. Accepts exactly one result.
pub(crate) struct ResultSlot<V, E> {
    state: SlotState<V, E>,
}

impl<V, E> ResultSlot<V, E>
where
    V: Send + Sync + Clone + 'static,
    E: Send + Sync + Clone + 'static,
{
    pub(crate) fn new() -> (Self, LoadFuture<V, E>) {
        let (tx, rx) = oneshot::channel();
        let inner = rx
            .map(|settled| settled.unwrap_or(Err(Error::Canceled)))
            .boxed()
            .shared();

        (Self { state: SlotState::Pending(tx) }, LoadFuture { inner })
    }

    /// Settles the slot.
    ///
    /// # Panics
    ///
    /// Settling a slot twice is a bug in the dispatcher and panics.
    pub(crate) fn settle(&mut self, result: Output<V, E>) {
        match std::mem::replace(&mut self.state, SlotState::Settled) {
            SlotState::Pending(tx) => {
                if tx.send(result).is_err() {
                    tracing::trace!("load future dropped before its result arrived");
                }
            }
            SlotState::Settled => panic!("result slot settled twice"),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_settled(&self) -> bool {
        matches!(self.state, SlotState::Settled)
    }
}
