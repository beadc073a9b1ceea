//! Bridge an externally driven channel into a [`Source`].
//!
//! The producer side of a channel usually runs on its own, observing a
//! cancellation token and holding resources which must be released once the
//! consumer is gone. [`FromChannel`] owns that producer's [`Lifecycle`] and
//! is the one place where cancellation crosses an ownership boundary: when the
//! consumer cancels, or a read from the channel fails, the bridge cancels the
//! producer and disposes its lifecycle.

use core::fmt;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll};
use std::sync::{Arc, Mutex, PoisonError};

use futures_core::{ready, Stream};
use pin_project::{pin_project, pinned_drop};

use super::Source;
use crate::{BoxError, CancelToken, Error, Result};

/// The lifecycle of a channel's producer.
pub trait Lifecycle {
    /// Ask the producer to stop.
    fn cancel(&self);

    /// Release the producer's resources. Only ever called once by
    /// [`FromChannel`].
    fn dispose(&mut self);

    /// Link the producer to the consumer's token so that cancelling the
    /// consumer cancels and disposes the producer without the bridge being
    /// polled again.
    ///
    /// The default implementation does nothing.
    fn attach(&self, _consumer: &CancelToken) {}
}

type DisposeFn = Box<dyn FnOnce() + Send>;

/// Dispose state shared between an [`Environment`] and the cancel callback
/// registered by [`Lifecycle::attach`].
#[derive(Default)]
struct Disposer {
    on_dispose: Mutex<Option<DisposeFn>>,
    disposed: AtomicBool,
}

impl Disposer {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let f = self
            .on_dispose
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(f) = f {
            f();
        }
    }
}

/// The stock [`Lifecycle`]: a producer cancellation token and an optional
/// dispose routine.
///
/// The dispose routine runs at most once: when the bridge disposes the
/// environment, when an attached consumer token is cancelled, or at the
/// latest when the environment is dropped.
pub struct Environment {
    token: CancelToken,
    disposer: Arc<Disposer>,
}

impl Environment {
    /// Create an environment with a fresh producer token.
    pub fn new() -> Self {
        Self::with_token(CancelToken::new())
    }

    /// Create an environment around an existing producer token.
    pub fn with_token(token: CancelToken) -> Self {
        Self {
            token,
            disposer: Arc::default(),
        }
    }

    /// Run `f` when the environment is disposed.
    pub fn on_dispose(self, f: impl FnOnce() + Send + 'static) -> Self {
        *self
            .disposer
            .on_dispose
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(f));
        self
    }

    /// The token the producer observes.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Returns `true` once the environment has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposer.disposed.load(Ordering::Acquire)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("token", &self.token)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Lifecycle for Environment {
    fn cancel(&self) {
        self.token.cancel();
    }

    fn dispose(&mut self) {
        self.disposer.dispose();
    }

    fn attach(&self, consumer: &CancelToken) {
        consumer.attach(&self.token);
        let disposer = Arc::clone(&self.disposer);
        self.token.on_cancel(move || {
            tracing::debug!("producer cancelled, disposing its environment");
            disposer.dispose();
        });
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.disposer.dispose();
    }
}

/// Creates a source which reads from `channel` and owns the producer's
/// `lifecycle`.
///
/// A channel is any stream of results: polling it waits until an item is
/// available, and the item is held by the source until it is read.
///
/// # Examples
///
/// ```
/// use source_concurrency::prelude::*;
/// use source_concurrency::{source, CancelToken, Environment};
/// use futures::channel::mpsc;
/// use futures::StreamExt;
/// use futures_lite::future::block_on;
///
/// block_on(async {
///     let (tx, rx) = mpsc::unbounded::<u32>();
///     let env = Environment::new();
///     tx.unbounded_send(1).unwrap();
///     tx.unbounded_send(2).unwrap();
///     drop(tx);
///
///     let s = source::from_channel(rx.map(Ok::<_, std::io::Error>), env);
///     let out: Vec<_> = s.collect(&CancelToken::new()).await.unwrap();
///     assert_eq!(out, vec![1, 2]);
/// })
/// ```
pub fn from_channel<S, L, T, E>(channel: S, lifecycle: L) -> FromChannel<S, L>
where
    S: Stream<Item = core::result::Result<T, E>>,
    E: Into<BoxError>,
    L: Lifecycle,
{
    FromChannel {
        channel,
        lifecycle,
        peeked: None,
        state: State::Open,
        attached: false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// The channel may still produce items.
    Open,
    /// The channel has ended or failed and the lifecycle has been disposed.
    Closed,
}

/// A source backed by a channel and its producer's lifecycle.
///
/// This `struct` is created by the [`from_channel`] function. See its
/// documentation for more.
#[pin_project(PinnedDrop)]
#[must_use = "sources do nothing unless polled"]
pub struct FromChannel<S, L>
where
    S: Stream,
    L: Lifecycle,
{
    #[pin]
    channel: S,
    lifecycle: L,
    peeked: Option<S::Item>,
    state: State,
    attached: bool,
}

impl<S, L> fmt::Debug for FromChannel<S, L>
where
    S: Stream + fmt::Debug,
    L: Lifecycle + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromChannel")
            .field("channel", &self.channel)
            .field("lifecycle", &self.lifecycle)
            .field("state", &self.state)
            .finish()
    }
}

/// Cancel the producer and release its resources.
fn shut_down<L: Lifecycle>(lifecycle: &mut L, state: &mut State, reason: &'static str) {
    if *state == State::Closed {
        return;
    }
    tracing::debug!(reason, "cancelling and disposing channel producer");
    lifecycle.cancel();
    lifecycle.dispose();
    *state = State::Closed;
}

impl<S, L, T, E> Source for FromChannel<S, L>
where
    S: Stream<Item = core::result::Result<T, E>>,
    E: Into<BoxError>,
    L: Lifecycle,
{
    type Item = T;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        let this = self.project();
        if cancel.is_cancelled() {
            shut_down(this.lifecycle, this.state, "cancelled");
            return Poll::Ready(Err(Error::Cancelled));
        }
        if !*this.attached {
            this.lifecycle.attach(cancel);
            *this.attached = true;
        }

        if let Some(Ok(_)) = this.peeked {
            return Poll::Ready(Ok(true));
        }
        if *this.state == State::Closed {
            return Poll::Ready(Ok(false));
        }
        match ready!(this.channel.poll_next(cx)) {
            Some(Ok(item)) => {
                *this.peeked = Some(Ok(item));
                Poll::Ready(Ok(true))
            }
            Some(Err(err)) => {
                shut_down(this.lifecycle, this.state, "read failed");
                Poll::Ready(Err(Error::user(err)))
            }
            None => {
                tracing::debug!("channel closed, disposing producer");
                this.lifecycle.dispose();
                *this.state = State::Closed;
                Poll::Ready(Ok(false))
            }
        }
    }

    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        let this = self.project();
        if cancel.is_cancelled() {
            shut_down(this.lifecycle, this.state, "cancelled");
            return Poll::Ready(Err(Error::Cancelled));
        }
        match this.peeked.take() {
            Some(Ok(item)) => Poll::Ready(Ok(item)),
            Some(Err(err)) => Poll::Ready(Err(Error::user(err))),
            None if *this.state == State::Closed => Poll::Ready(Err(Error::SourceClosed)),
            None => Poll::Ready(Err(Error::InvalidProtocolUse(
                "read_value called before ready_to_read",
            ))),
        }
    }
}

/// Stop the producer if the bridge goes away before the channel ended.
#[pinned_drop]
impl<S, L> PinnedDrop for FromChannel<S, L>
where
    S: Stream,
    L: Lifecycle,
{
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();
        shut_down(this.lifecycle, this.state, "dropped");
    }
}
