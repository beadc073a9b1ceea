use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::ready;
use pin_project::pin_project;

use super::zip::tuple::Zip2;
use super::{Source, Zip};
use crate::{CancelToken, Result};

/// A source which applies the functions produced by one source to the values
/// produced by another.
///
/// Both sources are waited on concurrently, exactly like [`Zip2`]; the k-th
/// function is applied to the k-th value.
///
/// This `struct` is created by the [`apply`] method on [`SourceExt`].
///
/// [`apply`]: super::SourceExt::apply
/// [`SourceExt`]: super::SourceExt
#[pin_project]
#[must_use = "sources do nothing unless polled"]
pub struct Apply<SF, SA>
where
    SF: Source,
    SA: Source,
{
    #[pin]
    inner: Zip2<SF, SA>,
}

impl<SF, SA> Apply<SF, SA>
where
    SF: Source,
    SA: Source,
{
    pub(crate) fn new(functions: SF, values: SA) -> Self {
        Self {
            inner: (functions, values).zip(),
        }
    }
}

impl<SF, SA> fmt::Debug for Apply<SF, SA>
where
    SF: Source + fmt::Debug,
    SA: Source + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Apply").field(&self.inner).finish()
    }
}

impl<SF, SA, B> Source for Apply<SF, SA>
where
    SF: Source,
    SA: Source,
    SF::Item: FnOnce(SA::Item) -> B,
{
    type Item = B;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        self.project().inner.poll_ready(cx, cancel)
    }

    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        let (f, value) = ready!(self.project().inner.poll_read(cx, cancel))?;
        Poll::Ready(Ok(f(value)))
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{source, CancelToken};
    use futures_lite::future::block_on;

    #[test]
    fn applies_functions_index_wise() {
        block_on(async {
            let cancel = CancelToken::new();
            let functions = source::from_iter([1, 2, 3]).map(|n| move |m: i32| n * m);
            let out: Vec<_> = functions
                .apply(source::from_iter([10, 20]))
                .collect(&cancel)
                .await
                .unwrap();
            assert_eq!(out, vec![10, 40]);
        })
    }

    #[test]
    fn pure_function_over_values() {
        block_on(async {
            let cancel = CancelToken::new();
            let double = |n: i32| n * 2;
            let out: Vec<_> = source::forever(double)
                .apply(source::from_iter(1..=3))
                .collect(&cancel)
                .await
                .unwrap();
            assert_eq!(out, vec![2, 4, 6]);
        })
    }
}
