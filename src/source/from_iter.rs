use core::pin::Pin;
use core::task::{Context, Poll};

use super::Source;
use crate::{CancelToken, Error, Result};

/// Converts an iterator into a source.
///
/// Each read advances the iterator by one element. Once the iterator returns
/// `None` it is never polled again.
pub fn from_iter<I: IntoIterator>(iter: I) -> FromIter<I::IntoIter> {
    FromIter {
        iter: Some(iter.into_iter()),
        peeked: None,
    }
}

/// A source that was created from an iterator.
///
/// This `struct` is created by the [`from_iter`] function.
#[derive(Clone, Debug)]
#[must_use = "sources do nothing unless polled"]
pub struct FromIter<I: Iterator> {
    // `None` once the iterator is exhausted.
    iter: Option<I>,
    peeked: Option<I::Item>,
}

impl<I: Iterator> Unpin for FromIter<I> {}

impl<I: Iterator> Source for FromIter<I> {
    type Item = I::Item;

    fn poll_ready(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        let this = &mut *self;
        if this.peeked.is_some() {
            return Poll::Ready(Ok(true));
        }
        match this.iter.as_mut().and_then(Iterator::next) {
            Some(item) => {
                this.peeked = Some(item);
                Poll::Ready(Ok(true))
            }
            None => {
                this.iter = None;
                Poll::Ready(Ok(false))
            }
        }
    }

    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        let this = &mut *self;
        match this.peeked.take() {
            Some(item) => Poll::Ready(Ok(item)),
            None if this.iter.is_none() => Poll::Ready(Err(Error::SourceClosed)),
            None => Poll::Ready(Err(Error::InvalidProtocolUse(
                "read_value called before ready_to_read",
            ))),
        }
    }
}
