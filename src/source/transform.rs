use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::ready;
use pin_project::pin_project;

use super::Source;
use crate::transducer::{Step, Transducer};
use crate::{CancelToken, Error, Result};

/// A source which runs every upstream value through a [`Transducer`].
///
/// Readiness pulls upstream values until the transducer yields one, which is
/// held until it is read. A transducer which stops turns this source into an
/// empty one for good.
///
/// This `struct` is created by the [`transform`] method on [`SourceExt`].
///
/// [`transform`]: super::SourceExt::transform
/// [`SourceExt`]: super::SourceExt
#[pin_project]
#[must_use = "sources do nothing unless polled"]
pub struct Transform<S, T>
where
    S: Source,
    T: Transducer<S::Item>,
{
    #[pin]
    source: S,
    transducer: T,
    cached: Option<T::Out>,
    upstream_ready: bool,
    done: bool,
}

impl<S, T> Transform<S, T>
where
    S: Source,
    T: Transducer<S::Item>,
{
    pub(crate) fn new(source: S, transducer: T) -> Self {
        Self {
            source,
            transducer,
            cached: None,
            upstream_ready: false,
            done: false,
        }
    }
}

impl<S, T> fmt::Debug for Transform<S, T>
where
    S: Source + fmt::Debug,
    T: Transducer<S::Item>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("source", &self.source)
            .field("done", &self.done)
            .finish()
    }
}

impl<S, T> Source for Transform<S, T>
where
    S: Source,
    T: Transducer<S::Item>,
{
    type Item = T::Out;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        let mut this = self.project();
        if this.cached.is_some() {
            return Poll::Ready(Ok(true));
        }

        loop {
            if *this.done {
                return Poll::Ready(Ok(false));
            }
            if this.transducer.completed() {
                *this.done = true;
                continue;
            }
            if !*this.upstream_ready {
                if !ready!(this.source.as_mut().poll_ready(cx, cancel))? {
                    *this.done = true;
                    continue;
                }
                *this.upstream_ready = true;
            }
            let input = ready!(this.source.as_mut().poll_read(cx, cancel))?;
            *this.upstream_ready = false;

            match this.transducer.step(input)? {
                Step::Continue(None) => continue,
                Step::Continue(Some(out)) => {
                    *this.cached = Some(out);
                    return Poll::Ready(Ok(true));
                }
                Step::Stop(out) => {
                    tracing::trace!("transducer stopped, no longer reading upstream");
                    *this.done = true;
                    if let Some(out) = out {
                        *this.cached = Some(out);
                        return Poll::Ready(Ok(true));
                    }
                }
            }
        }
    }

    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        cancel.check()?;
        let this = self.project();
        match this.cached.take() {
            Some(out) => Poll::Ready(Ok(out)),
            None if *this.done => Poll::Ready(Err(Error::SourceClosed)),
            None => Poll::Ready(Err(Error::InvalidProtocolUse(
                "read_value called before ready_to_read",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{source, CancelToken, Error, Step};
    use futures_lite::future::block_on;
    use std::cell::Cell;

    #[test]
    fn many_to_one_and_many_to_none() {
        block_on(async {
            let cancel = CancelToken::new();
            let out: Vec<_> = source::from_iter(0..10)
                .filter(|n| n % 3 == 0)
                .collect(&cancel)
                .await
                .unwrap();
            assert_eq!(out, vec![0, 3, 6, 9]);

            let mut nothing = source::from_iter(0..10).filter(|_| false);
            assert!(!nothing.ready_to_read(&cancel).await.unwrap());
        })
    }

    #[test]
    fn stop_is_terminal_and_stops_pulling() {
        block_on(async {
            let cancel = CancelToken::new();
            let pulled = Cell::new(0);
            let mut s = source::from_iter((0..).inspect(|_| pulled.set(pulled.get() + 1))).take(2);
            let mut out = vec![];
            while s.ready_to_read(&cancel).await.unwrap() {
                out.push(s.read_value(&cancel).await.unwrap());
            }
            assert_eq!(out, vec![0, 1]);
            assert!(!s.ready_to_read(&cancel).await.unwrap());
            assert_eq!(pulled.get(), 2);
            assert!(matches!(
                s.read_value(&cancel).await,
                Err(Error::SourceClosed)
            ));
        })
    }

    #[test]
    fn take_zero_pulls_nothing() {
        block_on(async {
            let cancel = CancelToken::new();
            let pulled = Cell::new(0);
            let mut s = source::from_iter((0..).inspect(|_| pulled.set(pulled.get() + 1))).take(0);
            assert!(!s.ready_to_read(&cancel).await.unwrap());
            assert_eq!(pulled.get(), 0);
        })
    }

    #[test]
    fn transducer_failure_is_surfaced_verbatim() {
        block_on(async {
            let cancel = CancelToken::new();
            let mut s = source::from_iter([1, 2]).transform(|n: i32| {
                if n == 2 {
                    Err(Error::user("two is not allowed"))
                } else {
                    Ok(Step::Continue(Some(n)))
                }
            });
            assert!(s.ready_to_read(&cancel).await.unwrap());
            assert_eq!(s.read_value(&cancel).await.unwrap(), 1);
            let err = s.ready_to_read(&cancel).await.unwrap_err();
            assert_eq!(err.to_string(), "two is not allowed");
        })
    }

    #[test]
    fn read_before_ready_is_rejected() {
        block_on(async {
            let cancel = CancelToken::new();
            let mut s = source::forever(1).skip(1);
            assert!(matches!(
                s.read_value(&cancel).await,
                Err(Error::InvalidProtocolUse(_))
            ));
        })
    }
}
