use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::ready;
use pin_project::pin_project;

use super::{IntoSource, Source};
use crate::{BoxError, CancelToken, Error, Result};

/// A source which maps every value to a new source and yields that source's
/// values.
///
/// Only one derived source is alive at a time. Once it is exhausted it is
/// dropped and the next upstream value is pulled; derived sources which are
/// exhausted from the start are skipped without yielding anything.
///
/// This `struct` is created by the [`bind`] method on [`SourceExt`].
///
/// [`bind`]: super::SourceExt::bind
/// [`SourceExt`]: super::SourceExt
#[pin_project]
#[must_use = "sources do nothing unless polled"]
pub struct Bind<S, F, C> {
    #[pin]
    source: S,
    f: F,
    #[pin]
    current: Option<C>,
    upstream_ready: bool,
    done: bool,
}

impl<S, F, C> Bind<S, F, C> {
    pub(crate) fn new(source: S, f: F) -> Self {
        Self {
            source,
            f,
            current: None,
            upstream_ready: false,
            done: false,
        }
    }
}

impl<S: fmt::Debug, F, C: fmt::Debug> fmt::Debug for Bind<S, F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bind")
            .field("source", &self.source)
            .field("current", &self.current)
            .finish()
    }
}

impl<S, F, U, C> Source for Bind<S, F, C>
where
    S: Source,
    F: FnMut(S::Item) -> U,
    U: IntoSource<IntoSource = C, Item = C::Item>,
    C: Source,
{
    type Item = C::Item;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        let this = self.project();
        let f = this.f;
        poll_bound_ready(
            this.source,
            this.current,
            this.upstream_ready,
            this.done,
            cx,
            cancel,
            |value| Ok(f(value).into_source()),
        )
    }

    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        let this = self.project();
        poll_bound_read(this.current, *this.done, cx, cancel)
    }
}

/// A source which maps every value to a new source with a fallible function
/// and yields that source's values.
///
/// A failure of the function surfaces as [`Error::User`] from the readiness
/// check; the upstream value it was given is consumed and the next readiness
/// check carries on with the following one.
///
/// This `struct` is created by the [`try_bind`] method on [`SourceExt`].
///
/// [`try_bind`]: super::SourceExt::try_bind
/// [`SourceExt`]: super::SourceExt
#[pin_project]
#[must_use = "sources do nothing unless polled"]
pub struct TryBind<S, F, C> {
    #[pin]
    source: S,
    f: F,
    #[pin]
    current: Option<C>,
    upstream_ready: bool,
    done: bool,
}

impl<S, F, C> TryBind<S, F, C> {
    pub(crate) fn new(source: S, f: F) -> Self {
        Self {
            source,
            f,
            current: None,
            upstream_ready: false,
            done: false,
        }
    }
}

impl<S: fmt::Debug, F, C: fmt::Debug> fmt::Debug for TryBind<S, F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryBind")
            .field("source", &self.source)
            .field("current", &self.current)
            .finish()
    }
}

impl<S, F, U, E, C> Source for TryBind<S, F, C>
where
    S: Source,
    F: FnMut(S::Item) -> core::result::Result<U, E>,
    E: Into<BoxError>,
    U: IntoSource<IntoSource = C, Item = C::Item>,
    C: Source,
{
    type Item = C::Item;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        let this = self.project();
        let f = this.f;
        poll_bound_ready(
            this.source,
            this.current,
            this.upstream_ready,
            this.done,
            cx,
            cancel,
            |value| f(value).map(IntoSource::into_source).map_err(Error::user),
        )
    }

    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        let this = self.project();
        poll_bound_read(this.current, *this.done, cx, cancel)
    }
}

/// Readiness of the current child, pulling upstream values into new children
/// until one of them is ready or upstream is exhausted.
fn poll_bound_ready<S, C>(
    mut source: Pin<&mut S>,
    mut current: Pin<&mut Option<C>>,
    upstream_ready: &mut bool,
    done: &mut bool,
    cx: &mut Context<'_>,
    cancel: &CancelToken,
    mut make: impl FnMut(S::Item) -> Result<C>,
) -> Poll<Result<bool>>
where
    S: Source,
    C: Source,
{
    loop {
        let child_ready = match current.as_mut().as_pin_mut() {
            Some(child) => Some(ready!(child.poll_ready(cx, cancel))?),
            None => None,
        };
        match child_ready {
            Some(true) => return Poll::Ready(Ok(true)),
            Some(false) => {
                // Never ask an exhausted child again.
                tracing::trace!("bound source exhausted, pulling upstream");
                current.set(None);
            }
            None => {}
        }

        if *done {
            return Poll::Ready(Ok(false));
        }
        if !*upstream_ready {
            if !ready!(source.as_mut().poll_ready(cx, cancel))? {
                *done = true;
                return Poll::Ready(Ok(false));
            }
            *upstream_ready = true;
        }
        let value = ready!(source.as_mut().poll_read(cx, cancel))?;
        *upstream_ready = false;
        current.set(Some(make(value)?));
    }
}

fn poll_bound_read<C: Source>(
    current: Pin<&mut Option<C>>,
    done: bool,
    cx: &mut Context<'_>,
    cancel: &CancelToken,
) -> Poll<Result<C::Item>> {
    match current.as_pin_mut() {
        Some(child) => child.poll_read(cx, cancel),
        None if done => Poll::Ready(Err(Error::SourceClosed)),
        None => Poll::Ready(Err(Error::InvalidProtocolUse(
            "read_value called before ready_to_read",
        ))),
    }
}
