use core::pin::Pin;
use core::task::{Context, Poll};

use super::Source;
use crate::{CancelToken, Error, Result};

/// Creates a source which yields `value` exactly once.
pub fn once<T>(value: T) -> Once<T> {
    Once { value: Some(value) }
}

/// A source which yields a single value.
///
/// The value is moved out on the first read, after which the source behaves
/// like [`Empty`][super::Empty]. Exclusive access through `Pin<&mut Self>`
/// makes the single read race-free without any atomics.
///
/// This `struct` is created by the [`once`] function.
#[derive(Clone, Debug)]
#[must_use = "sources do nothing unless polled"]
pub struct Once<T> {
    value: Option<T>,
}

impl<T> Unpin for Once<T> {}

impl<T> Source for Once<T> {
    type Item = T;

    fn poll_ready(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        Poll::Ready(Ok(self.value.is_some()))
    }

    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        Poll::Ready(self.value.take().ok_or(Error::SourceClosed))
    }
}
