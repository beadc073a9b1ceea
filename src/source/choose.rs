use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::ready;
use pin_project::pin_project;

use super::Source;
use crate::{CancelToken, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Left,
    Right,
}

/// A source which races two sources for readiness and falls back from the
/// left to the right one when reading fails.
///
/// Readiness is symmetric: both sides are polled on every call and the source
/// is ready as soon as either side is, so a slow left side never starves a
/// fast right side. Reading is asymmetric: the left side is read first if it
/// is ready, and any failure other than cancellation is swallowed in favour of
/// reading the right side. A failed left side sits out until the right side
/// has produced that value, then it is asked again. Only if the right side
/// also fails is its error surfaced.
///
/// This `struct` is created by the [`choose`] method on [`SourceExt`].
///
/// [`choose`]: super::SourceExt::choose
/// [`SourceExt`]: super::SourceExt
#[pin_project]
#[must_use = "sources do nothing unless polled"]
pub struct Choose<L, R> {
    #[pin]
    left: L,
    #[pin]
    right: R,
    // `None` while the side's readiness is unsettled.
    left_ready: Option<bool>,
    right_ready: Option<bool>,
    // The left side failed and sits out the current value.
    left_failed: bool,
    right_error: Option<Error>,
    reading: Branch,
}

impl<L, R> Choose<L, R> {
    pub(crate) fn new(left: L, right: R) -> Self {
        Self {
            left,
            right,
            left_ready: None,
            right_ready: None,
            left_failed: false,
            right_error: None,
            reading: Branch::Left,
        }
    }
}

impl<L: fmt::Debug, R: fmt::Debug> fmt::Debug for Choose<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Choose")
            .field(&self.left)
            .field(&self.right)
            .finish()
    }
}

impl<L, R> Source for Choose<L, R>
where
    L: Source,
    R: Source<Item = L::Item>,
{
    type Item = L::Item;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        let this = self.project();
        if *this.left_ready == Some(true) || *this.right_ready == Some(true) {
            return Poll::Ready(Ok(true));
        }

        if this.left_ready.is_none() {
            if let Poll::Ready(res) = this.left.poll_ready(cx, cancel) {
                match res {
                    Ok(ready) => *this.left_ready = Some(ready),
                    Err(err) if err.is_cancelled() => return Poll::Ready(Err(err)),
                    Err(err) => {
                        tracing::trace!(error = %err, "left source failed readiness, relying on right");
                        *this.left_ready = Some(false);
                        *this.left_failed = true;
                    }
                }
            }
        }
        if *this.left_ready == Some(true) {
            return Poll::Ready(Ok(true));
        }

        if this.right_ready.is_none() {
            if let Poll::Ready(res) = this.right.poll_ready(cx, cancel) {
                match res {
                    Ok(ready) => *this.right_ready = Some(ready),
                    Err(err) if err.is_cancelled() => return Poll::Ready(Err(err)),
                    Err(err) => {
                        *this.right_ready = Some(false);
                        *this.right_error = Some(err);
                    }
                }
            }
        }

        match (*this.left_ready, *this.right_ready) {
            (_, Some(true)) => Poll::Ready(Ok(true)),
            (Some(false), Some(false)) => match this.right_error.take() {
                Some(err) => Poll::Ready(Err(err)),
                None => Poll::Ready(Ok(false)),
            },
            _ => Poll::Pending,
        }
    }

    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        let mut this = self.project();

        if *this.reading == Branch::Left {
            if this.left_ready.is_none() && this.right_ready.is_none() {
                return Poll::Ready(Err(Error::InvalidProtocolUse(
                    "read_value called before ready_to_read",
                )));
            }
            if *this.left_ready == Some(true) {
                match ready!(this.left.as_mut().poll_read(cx, cancel)) {
                    Ok(item) => {
                        *this.left_ready = None;
                        return Poll::Ready(Ok(item));
                    }
                    Err(err) if err.is_cancelled() => return Poll::Ready(Err(err)),
                    Err(err) => {
                        tracing::trace!(error = %err, "left source failed to read, falling back to right");
                        *this.left_ready = Some(false);
                        *this.left_failed = true;
                    }
                }
            }
            *this.reading = Branch::Right;
        }

        if this.right_ready.is_none() {
            match ready!(this.right.as_mut().poll_ready(cx, cancel)) {
                Ok(ready) => *this.right_ready = Some(ready),
                Err(err) => {
                    *this.reading = Branch::Left;
                    *this.right_ready = Some(false);
                    return Poll::Ready(Err(err));
                }
            }
        }
        if *this.right_ready == Some(false) {
            *this.reading = Branch::Left;
            let err = this.right_error.take().unwrap_or(Error::SourceClosed);
            return Poll::Ready(Err(err));
        }

        let res = ready!(this.right.as_mut().poll_read(cx, cancel));
        *this.reading = Branch::Left;
        *this.right_ready = None;
        if *this.left_failed {
            // A failure is not exhaustion: ask the left side again next time.
            *this.left_failed = false;
            *this.left_ready = None;
        }
        Poll::Ready(res)
    }
}
