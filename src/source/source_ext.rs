use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::{ready, Stream};
use pin_project::pin_project;

use super::{
    Apply, Bind, BoxSource, Choose, IntoSource, LocalBoxSource, Map, Source, Transform, TryBind,
    TryMap,
};
use crate::source::zip::tuple::Zip2;
use crate::transducer::{self, Transducer};
use crate::{BoxError, CancelToken, Result};

/// Poll `f`, registering the task with `cancel` whenever it suspends so that a
/// later cancellation wakes the consumer.
#[inline]
fn poll_registered<T>(
    cx: &mut Context<'_>,
    cancel: &CancelToken,
    f: impl FnOnce(&mut Context<'_>) -> Poll<T>,
) -> Poll<T> {
    let poll = f(cx);
    if poll.is_pending() {
        cancel.register(cx.waker());
    }
    poll
}

/// An extension trait for the [`Source`] trait.
pub trait SourceExt: Source {
    /// Wait until a value is ready to be read, or the source is exhausted.
    ///
    /// Resolves to `true` iff the following [`read_value`][Self::read_value]
    /// is guaranteed to succeed.
    fn ready_to_read<'a>(&'a mut self, cancel: &'a CancelToken) -> ReadyToRead<'a, Self>
    where
        Self: Unpin,
    {
        ReadyToRead {
            source: self,
            cancel,
        }
    }

    /// Take exactly one value. Must follow a `true` [`ready_to_read`][Self::ready_to_read].
    fn read_value<'a>(&'a mut self, cancel: &'a CancelToken) -> ReadValue<'a, Self>
    where
        Self: Unpin,
    {
        ReadValue {
            source: self,
            cancel,
        }
    }

    /// Apply a function to every value.
    fn map<B, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> B,
    {
        Map::new(self, f)
    }

    /// Apply a fallible function to every value. A failure surfaces as
    /// [`Error::User`][crate::Error::User].
    fn try_map<B, E, F>(self, f: F) -> TryMap<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> core::result::Result<B, E>,
        E: Into<BoxError>,
    {
        TryMap::new(self, f)
    }

    /// Apply every function produced by this source to the value produced at
    /// the same position by `values`.
    fn apply<B, S2>(self, values: S2) -> Apply<Self, S2::IntoSource>
    where
        Self: Sized,
        S2: IntoSource,
        Self::Item: FnOnce(S2::Item) -> B,
    {
        Apply::new(self, values.into_source())
    }

    /// Map every value to a new source and yield that source's values.
    ///
    /// Values whose derived source is immediately exhausted are skipped.
    fn bind<S2, F>(self, f: F) -> Bind<Self, F, S2::IntoSource>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> S2,
        S2: IntoSource,
    {
        Bind::new(self, f)
    }

    /// Map every value to a new source with a fallible function and yield
    /// that source's values. A failure surfaces as
    /// [`Error::User`][crate::Error::User].
    fn try_bind<S2, E, F>(self, f: F) -> TryBind<Self, F, S2::IntoSource>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> core::result::Result<S2, E>,
        E: Into<BoxError>,
        S2: IntoSource,
    {
        TryBind::new(self, f)
    }

    /// Race this source against `other` for readiness. Reads try this source
    /// first and fall back to `other` if it fails.
    fn choose<S2>(self, other: S2) -> Choose<Self, S2::IntoSource>
    where
        Self: Sized,
        S2: IntoSource<Item = Self::Item>,
    {
        Choose::new(self, other.into_source())
    }

    /// ‘Zips up’ this source with `other` into a source of pairs.
    fn zip<S2>(self, other: S2) -> Zip2<Self, S2::IntoSource>
    where
        Self: Sized,
        S2: IntoSource,
    {
        crate::source::Zip::zip((self, other))
    }

    /// Run every value through a [`Transducer`].
    fn transform<T>(self, transducer: T) -> Transform<Self, T>
    where
        Self: Sized,
        T: Transducer<Self::Item>,
    {
        Transform::new(self, transducer)
    }

    /// Only yield values for which `predicate` returns `true`.
    fn filter<P>(self, predicate: P) -> Transform<Self, transducer::Filter<P>>
    where
        Self: Sized,
        P: FnMut(&Self::Item) -> bool,
    {
        self.transform(transducer::filter(predicate))
    }

    /// Map and filter in one step.
    fn filter_map<B, F>(self, f: F) -> Transform<Self, transducer::FilterMap<F>>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> Option<B>,
    {
        self.transform(transducer::filter_map(f))
    }

    /// Yield at most `n` values, then stop reading from this source.
    fn take(self, n: usize) -> Transform<Self, transducer::Take>
    where
        Self: Sized,
    {
        self.transform(transducer::take(n))
    }

    /// Discard the first `n` values.
    fn skip(self, n: usize) -> Transform<Self, transducer::Skip>
    where
        Self: Sized,
    {
        self.transform(transducer::skip(n))
    }

    /// Yield values while `predicate` holds, then stop reading from this source.
    fn take_while<P>(self, predicate: P) -> Transform<Self, transducer::TakeWhile<P>>
    where
        Self: Sized,
        P: FnMut(&Self::Item) -> bool,
    {
        self.transform(transducer::take_while(predicate))
    }

    /// Thread a state through every value, yielding each intermediate output.
    fn scan<St, B, F>(self, state: St, f: F) -> Transform<Self, transducer::Scan<St, F>>
    where
        Self: Sized,
        F: FnMut(&mut St, Self::Item) -> Option<B>,
    {
        self.transform(transducer::scan(state, f))
    }

    /// Drive the source as a [`Stream`] of results. The stream ends after the
    /// source is exhausted or after the first error.
    fn values(self, cancel: CancelToken) -> Values<Self>
    where
        Self: Sized,
    {
        Values {
            source: self,
            cancel,
            ready: false,
            done: false,
        }
    }

    /// Drive the source to exhaustion, folding every value into an
    /// accumulator.
    fn fold<B, F>(self, init: B, f: F, cancel: &CancelToken) -> Fold<'_, Self, B, F>
    where
        Self: Sized,
        F: FnMut(B, Self::Item) -> B,
    {
        Fold {
            source: self,
            acc: Some(init),
            f,
            cancel,
            ready: false,
        }
    }

    /// Drive the source to exhaustion, collecting every value.
    fn collect<C>(self, cancel: &CancelToken) -> Collect<'_, Self, C>
    where
        Self: Sized,
        C: Default + Extend<Self::Item>,
    {
        Collect {
            source: self,
            collection: Some(C::default()),
            cancel,
            ready: false,
        }
    }

    /// Box the source, erasing its type.
    fn boxed<'a>(self) -> BoxSource<'a, Self::Item>
    where
        Self: Sized + Send + 'a,
    {
        Box::pin(self)
    }

    /// Box the source, erasing its type. The result is not `Send`.
    fn boxed_local<'a>(self) -> LocalBoxSource<'a, Self::Item>
    where
        Self: Sized + 'a,
    {
        Box::pin(self)
    }
}

impl<S: Source + ?Sized> SourceExt for S {}

/// Future for the [`ready_to_read`][SourceExt::ready_to_read] method.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct ReadyToRead<'a, S: ?Sized> {
    source: &'a mut S,
    cancel: &'a CancelToken,
}

impl<S: ?Sized + Unpin> Unpin for ReadyToRead<'_, S> {}

impl<S: ?Sized + fmt::Debug> fmt::Debug for ReadyToRead<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadyToRead").field(&self.source).finish()
    }
}

impl<S: Source + Unpin + ?Sized> Future for ReadyToRead<'_, S> {
    type Output = Result<bool>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let cancel = this.cancel;
        poll_registered(cx, cancel, |cx| {
            Pin::new(&mut *this.source).poll_ready(cx, cancel)
        })
    }
}

/// Future for the [`read_value`][SourceExt::read_value] method.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct ReadValue<'a, S: ?Sized> {
    source: &'a mut S,
    cancel: &'a CancelToken,
}

impl<S: ?Sized + Unpin> Unpin for ReadValue<'_, S> {}

impl<S: ?Sized + fmt::Debug> fmt::Debug for ReadValue<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadValue").field(&self.source).finish()
    }
}

impl<S: Source + Unpin + ?Sized> Future for ReadValue<'_, S> {
    type Output = Result<S::Item>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let cancel = this.cancel;
        poll_registered(cx, cancel, |cx| {
            Pin::new(&mut *this.source).poll_read(cx, cancel)
        })
    }
}

/// A stream over the values of a source.
///
/// This `struct` is created by the [`values`] method on [`SourceExt`].
///
/// [`values`]: SourceExt::values
#[pin_project]
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct Values<S> {
    #[pin]
    source: S,
    cancel: CancelToken,
    ready: bool,
    done: bool,
}

impl<S: Source> Stream for Values<S> {
    type Item = Result<S::Item>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        let cancel = &*this.cancel;
        let next = poll_registered(cx, cancel, |cx| {
            if !*this.ready {
                match ready!(this.source.as_mut().poll_ready(cx, cancel)) {
                    Ok(true) => *this.ready = true,
                    Ok(false) => return Poll::Ready(None),
                    Err(err) => return Poll::Ready(Some(Err(err))),
                }
            }
            let item = ready!(this.source.as_mut().poll_read(cx, cancel));
            *this.ready = false;
            Poll::Ready(Some(item))
        });
        match &next {
            Poll::Ready(None) | Poll::Ready(Some(Err(_))) => *this.done = true,
            _ => {}
        }
        next
    }
}

/// Future for the [`fold`][SourceExt::fold] method.
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Fold<'a, S, B, F> {
    #[pin]
    source: S,
    acc: Option<B>,
    f: F,
    cancel: &'a CancelToken,
    ready: bool,
}

impl<S: fmt::Debug, B: fmt::Debug, F> fmt::Debug for Fold<'_, S, B, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fold")
            .field("source", &self.source)
            .field("acc", &self.acc)
            .finish()
    }
}

impl<S, B, F> Future for Fold<'_, S, B, F>
where
    S: Source,
    F: FnMut(B, S::Item) -> B,
{
    type Output = Result<B>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        let cancel = *this.cancel;
        poll_registered(cx, cancel, |cx| -> Poll<Result<B>> {
            loop {
                if !*this.ready {
                    if !ready!(this.source.as_mut().poll_ready(cx, cancel))? {
                        let acc = this.acc.take().expect("`Fold` polled after completion");
                        return Poll::Ready(Ok(acc));
                    }
                    *this.ready = true;
                }
                let item = ready!(this.source.as_mut().poll_read(cx, cancel))?;
                *this.ready = false;
                let acc = this.acc.take().expect("`Fold` polled after completion");
                *this.acc = Some((this.f)(acc, item));
            }
        })
    }
}

/// Future for the [`collect`][SourceExt::collect] method.
#[pin_project]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Collect<'a, S, C> {
    #[pin]
    source: S,
    collection: Option<C>,
    cancel: &'a CancelToken,
    ready: bool,
}

impl<S: fmt::Debug, C: fmt::Debug> fmt::Debug for Collect<'_, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collect")
            .field("source", &self.source)
            .field("collection", &self.collection)
            .finish()
    }
}

impl<S, C> Future for Collect<'_, S, C>
where
    S: Source,
    C: Extend<S::Item>,
{
    type Output = Result<C>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        let cancel = *this.cancel;
        poll_registered(cx, cancel, |cx| -> Poll<Result<C>> {
            loop {
                if !*this.ready {
                    if !ready!(this.source.as_mut().poll_ready(cx, cancel))? {
                        let out = this
                            .collection
                            .take()
                            .expect("`Collect` polled after completion");
                        return Poll::Ready(Ok(out));
                    }
                    *this.ready = true;
                }
                let item = ready!(this.source.as_mut().poll_read(cx, cancel))?;
                *this.ready = false;
                if let Some(collection) = this.collection.as_mut() {
                    collection.extend(Some(item));
                }
            }
        })
    }
}
