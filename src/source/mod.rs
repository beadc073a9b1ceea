//! Composable pull-based asynchronous sources.
//!
//! # Examples
//!
//! Flat-map every value into a new source, skipping values whose derived
//! source is empty:
//!
//! ```
//! use source_concurrency::prelude::*;
//! use source_concurrency::{source, CancelToken};
//! use futures_lite::future::block_on;
//!
//! block_on(async {
//!     let cancel = CancelToken::new();
//!     let s = source::from_iter(1..=3).bind(|n| source::from_iter(0..n));
//!     let out: Vec<_> = s.collect(&cancel).await.unwrap();
//!     assert_eq!(out, vec![0, 0, 1, 0, 1, 2]);
//! })
//! ```
//!
//! # The protocol
//!
//! A consumer repeatedly asks whether a value is ready and, only if it is,
//! reads it. Asking again without reading returns the same answer and never
//! loses a value. Reading without a preceding `true` readiness answer fails
//! with [`Error::InvalidProtocolUse`][crate::Error::InvalidProtocolUse] or
//! [`Error::SourceClosed`][crate::Error::SourceClosed] rather than corrupting
//! state.
//!
//! | Name        | Return signature               | When does it return? |
//! | ---         | ---                            | ---                  |
//! | `ready_to_read` | `Result<bool>`             | Once a read is guaranteed to succeed, or the source is exhausted.
//! | `read_value`    | `Result<Item>`             | Once exactly one value has been taken.

use core::ops::DerefMut;
use core::pin::Pin;
use core::task::{Context, Poll};

use crate::{CancelToken, Result};

pub(crate) mod apply;
pub(crate) mod bind;
pub(crate) mod channel;
pub(crate) mod choose;
pub(crate) mod combine;
pub(crate) mod empty;
pub(crate) mod forever;
pub(crate) mod from_iter;
pub(crate) mod from_stream;
pub(crate) mod map;
pub(crate) mod once;
mod into_source;
mod source_ext;
pub(crate) mod transform;
pub(crate) mod zip;

pub use apply::Apply;
pub use bind::{Bind, TryBind};
pub use channel::{from_channel, FromChannel};
pub use choose::Choose;
pub use combine::Combine;
pub use empty::{empty, Empty};
pub use forever::{forever, Forever};
pub use from_iter::{from_iter, FromIter};
pub use from_stream::{from_stream, FromStream};
pub use into_source::IntoSource;
pub use map::{Map, TryMap};
pub use once::{once, Once};
pub use source_ext::{Collect, Fold, ReadValue, ReadyToRead, SourceExt, Values};
pub use transform::Transform;
pub use zip::Zip;

/// A pull-based asynchronous producer of values.
///
/// Both operations may suspend and both are cancellation aware: when `cancel`
/// is already signaled an implementation resolves to
/// [`Error::Cancelled`][crate::Error::Cancelled] without polling any child.
///
/// Implementations must resolve on the first poll when everything they wait
/// on is already complete. Nested combinators therefore complete without any
/// suspension in the common case.
#[must_use = "sources do nothing unless polled"]
pub trait Source {
    /// Values yielded by the source.
    type Item;

    /// Attempt to learn whether a value is ready to be read.
    ///
    /// Resolves to `true` iff a subsequent [`poll_read`][Source::poll_read]
    /// is guaranteed to succeed. `false` marks the source as exhausted.
    /// Polling again after `true` without reading returns `true` again.
    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>>;

    /// Attempt to take exactly one value.
    ///
    /// Must only be called after `poll_ready` resolved to `true`.
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>>;
}

impl<S: ?Sized + Source + Unpin> Source for &mut S {
    type Item = S::Item;

    fn poll_ready(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        S::poll_ready(Pin::new(&mut **self), cx, cancel)
    }

    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        S::poll_read(Pin::new(&mut **self), cx, cancel)
    }
}

impl<S: ?Sized + Source + Unpin> Source for Box<S> {
    type Item = S::Item;

    fn poll_ready(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        Pin::new(&mut **self).poll_ready(cx, cancel)
    }

    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        Pin::new(&mut **self).poll_read(cx, cancel)
    }
}

impl<P> Source for Pin<P>
where
    P: DerefMut + Unpin,
    P::Target: Source,
{
    type Item = <P::Target as Source>::Item;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        self.get_mut().as_mut().poll_ready(cx, cancel)
    }

    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        self.get_mut().as_mut().poll_read(cx, cancel)
    }
}

/// A type-erased source, for compositions whose shape is only known at
/// runtime.
pub type BoxSource<'a, T> = Pin<Box<dyn Source<Item = T> + Send + 'a>>;

/// A type-erased source which is not `Send`.
pub type LocalBoxSource<'a, T> = Pin<Box<dyn Source<Item = T> + 'a>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use crate::utils::probe::{Calls, Probe};
    use crate::{Environment, Error};
    use futures::StreamExt;
    use futures_lite::future::block_on;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn assert_cancelled<S: Source + Unpin>(mut s: S, calls: &[&Calls]) {
        block_on(async {
            let cancel = CancelToken::new();
            cancel.cancel();
            assert!(matches!(
                s.ready_to_read(&cancel).await,
                Err(Error::Cancelled)
            ));
            assert!(matches!(
                s.read_value(&cancel).await,
                Err(Error::Cancelled)
            ));
        });
        for calls in calls {
            assert_eq!(calls.total(), 0, "a child was polled after cancellation");
        }
    }

    #[test]
    fn leaves_observe_cancellation() {
        assert_cancelled(empty::<u8>(), &[]);
        assert_cancelled(once(1), &[]);
        assert_cancelled(forever(1), &[]);
        assert_cancelled(from_iter(0..), &[]);
        assert_cancelled(from_stream(futures_lite::stream::repeat(1)), &[]);

        let (_tx, rx) = futures::channel::mpsc::unbounded::<u8>();
        let env = Environment::new();
        let producer = env.token().clone();
        assert_cancelled(from_channel(rx.map(Ok::<_, std::io::Error>), env), &[]);
        assert!(producer.is_cancelled());
    }

    #[test]
    fn combinators_do_not_touch_children_after_cancellation() {
        let (a, calls_a) = Probe::new(1);
        assert_cancelled(a.map(|n| n + 1), &[&calls_a]);

        let (a, calls_a) = Probe::new(1);
        assert_cancelled(a.try_map(|n| Ok::<_, std::io::Error>(n)), &[&calls_a]);

        let (a, calls_a) = Probe::new(1);
        assert_cancelled(a.filter(|_| true), &[&calls_a]);

        let (a, calls_a) = Probe::new(1);
        let (b, calls_b) = Probe::new(2);
        assert_cancelled(a.choose(b), &[&calls_a, &calls_b]);

        let (a, calls_a) = Probe::new(1);
        let (b, calls_b) = Probe::new(2);
        assert_cancelled(vec![a, b].combine(), &[&calls_a, &calls_b]);

        let (a, calls_a) = Probe::new(1);
        let (b, calls_b) = Probe::new(2);
        assert_cancelled([a, b].combine(), &[&calls_a, &calls_b]);

        let (a, calls_a) = Probe::new(1);
        let (b, calls_b) = Probe::new(2);
        assert_cancelled(a.zip(b), &[&calls_a, &calls_b]);

        let (a, calls_a) = Probe::new(1);
        let (b, calls_b) = Probe::new(2);
        let (c, calls_c) = Probe::new(3);
        let (d, calls_d) = Probe::new(4);
        assert_cancelled(
            (a, b, c, d).zip(),
            &[&calls_a, &calls_b, &calls_c, &calls_d],
        );

        let (a, calls_a) = Probe::new(1);
        let (b, calls_b) = Probe::new(2);
        let (c, calls_c) = Probe::new(3);
        assert_cancelled((a, b, c).zip(), &[&calls_a, &calls_b, &calls_c]);

        let (a, calls_a) = Probe::new(1);
        assert_cancelled(a.take(2), &[&calls_a]);

        let (a, calls_a) = Probe::new(1);
        assert_cancelled(a.skip(2), &[&calls_a]);

        let (a, calls_a) = Probe::new(1);
        assert_cancelled(a.scan(0, |acc: &mut i32, n| Some(*acc + n)), &[&calls_a]);

        let (a, calls_a) = Probe::new(1);
        assert_cancelled(
            a.try_bind(|n| Ok::<_, std::io::Error>(once(n))),
            &[&calls_a],
        );

        let (f, calls_f) = Probe::new(|n: i32| n);
        let (a, calls_a) = Probe::new(1);
        assert_cancelled(f.apply(a), &[&calls_f, &calls_a]);

        let (a, calls_a) = Probe::new(1);
        let (child, calls_child) = Probe::new(2);
        let mut child = Some(child);
        let bound = a.bind(move |_| child.take().unwrap_or_else(|| Probe::new(0).0));
        assert_cancelled(bound, &[&calls_a, &calls_child]);
    }

    #[test]
    fn nested_channel_bridge_is_shut_down() {
        let (_tx, rx) = futures::channel::mpsc::unbounded::<u8>();
        let env = Environment::new();
        let producer = env.token().clone();
        let (a, calls_a) = Probe::new(1);
        let bridge = from_channel(rx.map(Ok::<_, std::io::Error>), env);
        assert_cancelled((a, bridge).zip(), &[&calls_a]);
        assert!(producer.is_cancelled());

        // Cancelled after the bridge was first polled: the enclosing zip
        // never polls it again, yet the producer is stopped and disposed.
        let (tx, rx) = futures::channel::mpsc::unbounded::<u8>();
        let disposed = Arc::new(AtomicBool::new(false));
        let flag = disposed.clone();
        let env = Environment::new().on_dispose(move || flag.store(true, Ordering::SeqCst));
        let producer = env.token().clone();
        let mut s = (forever(0), from_channel(rx.map(Ok::<_, std::io::Error>), env)).zip();
        block_on(async {
            let cancel = CancelToken::new();
            tx.unbounded_send(5).unwrap();
            assert!(s.ready_to_read(&cancel).await.unwrap());
            assert_eq!(s.read_value(&cancel).await.unwrap(), (0, 5));
            cancel.cancel();
            assert!(producer.is_cancelled());
            assert!(disposed.load(Ordering::SeqCst));
            assert!(matches!(
                s.ready_to_read(&cancel).await,
                Err(Error::Cancelled)
            ));
        });
        assert!(producer.is_cancelled());
    }

    #[test]
    fn boxed_sources_delegate() {
        block_on(async {
            let cancel = CancelToken::new();
            let mut s: BoxSource<'static, u8> = once(3).boxed();
            assert!(s.ready_to_read(&cancel).await.unwrap());
            assert_eq!(s.read_value(&cancel).await.unwrap(), 3);

            let mut inner = from_iter([1, 2]);
            let by_ref = &mut inner;
            let out: Vec<_> = by_ref.take(1).collect(&cancel).await.unwrap();
            assert_eq!(out, vec![1]);
            assert!(inner.ready_to_read(&cancel).await.unwrap());
            assert_eq!(inner.read_value(&cancel).await.unwrap(), 2);
        })
    }
}
