use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::ready;
use pin_project::pin_project;

use super::Combine as CombineTrait;
use crate::source::{IntoSource, Source};
use crate::utils;
use crate::{CancelToken, Error, Result};

/// A source that runs multiple sources one after another.
///
/// This `struct` is created by the [`combine`] method on the [`Combine`] trait. See its
/// documentation for more.
///
/// [`combine`]: crate::source::Combine::combine
/// [`Combine`]: crate::source::Combine
#[pin_project]
#[must_use = "sources do nothing unless polled"]
pub struct Combine<S> {
    #[pin]
    sources: Vec<S>,
    index: usize,
}

impl<S: Source> Source for Combine<S> {
    type Item = S::Item;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        let mut this = self.project();

        loop {
            let Some(source) = utils::get_pin_mut_from_vec(this.sources.as_mut(), *this.index) else {
                return Poll::Ready(Ok(false));
            };
            if ready!(source.poll_ready(cx, cancel))? {
                return Poll::Ready(Ok(true));
            }
            *this.index += 1;
            tracing::trace!(index = *this.index, "combine advancing to next source");
        }
    }

    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        let this = self.project();
        match utils::get_pin_mut_from_vec(this.sources, *this.index) {
            Some(source) => source.poll_read(cx, cancel),
            None => Poll::Ready(Err(Error::SourceClosed)),
        }
    }
}

impl<S> fmt::Debug for Combine<S>
where
    S: Source + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.sources.iter()).finish()
    }
}

impl<S: IntoSource> CombineTrait for Vec<S> {
    type Item = S::Item;

    type Source = Combine<S::IntoSource>;

    fn combine(self) -> Self::Source {
        Combine {
            sources: self.into_iter().map(IntoSource::into_source).collect(),
            index: 0,
        }
    }
}
