use core::fmt;
use core::marker::PhantomData;
use core::pin::Pin;
use core::task::{Context, Poll};

use super::Source;
use crate::{CancelToken, Error, Result};

/// Creates a source which never yields a value.
///
/// # Examples
///
/// ```
/// use source_concurrency::prelude::*;
/// use source_concurrency::{source, CancelToken};
/// use futures_lite::future::block_on;
///
/// block_on(async {
///     let cancel = CancelToken::new();
///     let mut s = source::empty::<u8>();
///     assert!(!s.ready_to_read(&cancel).await.unwrap());
///     assert!(s.read_value(&cancel).await.is_err());
/// })
/// ```
pub fn empty<T>() -> Empty<T> {
    Empty {
        _marker: PhantomData,
    }
}

/// A source which never yields a value.
///
/// This `struct` is created by the [`empty`] function. See its
/// documentation for more.
#[must_use = "sources do nothing unless polled"]
pub struct Empty<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Unpin for Empty<T> {}

impl<T> Clone for Empty<T> {
    fn clone(&self) -> Self {
        empty()
    }
}

impl<T> fmt::Debug for Empty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Empty").finish()
    }
}

impl<T> Source for Empty<T> {
    type Item = T;

    fn poll_ready(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        Poll::Ready(Ok(false))
    }

    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        Poll::Ready(Err(Error::SourceClosed))
    }
}
