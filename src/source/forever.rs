use core::pin::Pin;
use core::task::{Context, Poll};

use super::Source;
use crate::{CancelToken, Result};

/// Creates a source which yields clones of `value` forever.
pub fn forever<T: Clone>(value: T) -> Forever<T> {
    Forever { value }
}

/// A source which is always ready and always yields the same value.
///
/// This `struct` is created by the [`forever`] function.
#[derive(Clone, Debug)]
#[must_use = "sources do nothing unless polled"]
pub struct Forever<T> {
    value: T,
}

impl<T> Unpin for Forever<T> {}

impl<T: Clone> Source for Forever<T> {
    type Item = T;

    fn poll_ready(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        Poll::Ready(Ok(true))
    }

    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        Poll::Ready(Ok(self.value.clone()))
    }
}
