use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::ready;
use pin_project::pin_project;

use super::Source;
use crate::{BoxError, CancelToken, Error, Result};

/// A source which applies a function to every value.
///
/// This `struct` is created by the [`map`] method on [`SourceExt`].
///
/// [`map`]: super::SourceExt::map
/// [`SourceExt`]: super::SourceExt
#[pin_project]
#[must_use = "sources do nothing unless polled"]
pub struct Map<S, F> {
    #[pin]
    source: S,
    f: F,
}

impl<S, F> Map<S, F> {
    pub(crate) fn new(source: S, f: F) -> Self {
        Self { source, f }
    }
}

impl<S: fmt::Debug, F> fmt::Debug for Map<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Map").field(&self.source).finish()
    }
}

impl<S, B, F> Source for Map<S, F>
where
    S: Source,
    F: FnMut(S::Item) -> B,
{
    type Item = B;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        self.project().source.poll_ready(cx, cancel)
    }

    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        let this = self.project();
        let item = ready!(this.source.poll_read(cx, cancel))?;
        Poll::Ready(Ok((this.f)(item)))
    }
}

/// A source which applies a fallible function to every value.
///
/// This `struct` is created by the [`try_map`] method on [`SourceExt`].
///
/// [`try_map`]: super::SourceExt::try_map
/// [`SourceExt`]: super::SourceExt
#[pin_project]
#[must_use = "sources do nothing unless polled"]
pub struct TryMap<S, F> {
    #[pin]
    source: S,
    f: F,
}

impl<S, F> TryMap<S, F> {
    pub(crate) fn new(source: S, f: F) -> Self {
        Self { source, f }
    }
}

impl<S: fmt::Debug, F> fmt::Debug for TryMap<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TryMap").field(&self.source).finish()
    }
}

impl<S, B, E, F> Source for TryMap<S, F>
where
    S: Source,
    F: FnMut(S::Item) -> core::result::Result<B, E>,
    E: Into<BoxError>,
{
    type Item = B;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        self.project().source.poll_ready(cx, cancel)
    }

    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        let this = self.project();
        let item = ready!(this.source.poll_read(cx, cancel))?;
        Poll::Ready((this.f)(item).map_err(Error::user))
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{source, CancelToken};
    use futures_lite::future::block_on;

    #[test]
    fn map_every_value() {
        block_on(async {
            let cancel = CancelToken::new();
            let out: Vec<_> = source::from_iter(1..=3)
                .map(|n| n * 2)
                .collect(&cancel)
                .await
                .unwrap();
            assert_eq!(out, vec![2, 4, 6]);
        })
    }

    #[test]
    fn try_map_surfaces_the_first_failure() {
        block_on(async {
            let cancel = CancelToken::new();
            let res = source::from_iter(["1", "x", "3"])
                .try_map(|s| s.parse::<u8>())
                .collect::<Vec<_>>(&cancel)
                .await;
            let err = res.unwrap_err();
            assert!(err.downcast_user::<core::num::ParseIntError>().is_some());
        })
    }
}
