use core::pin::Pin;
use core::task::{Context, Poll};

use futures_core::{ready, Stream};
use pin_project::pin_project;

use super::Source;
use crate::{CancelToken, Error, Result};

/// Converts a [`Stream`] into a source.
///
/// Readiness polls the stream for its next item and holds it until it is
/// read. Once the stream returns `None` it is never polled again.
pub fn from_stream<S: Stream>(stream: S) -> FromStream<S> {
    FromStream {
        stream,
        peeked: None,
        done: false,
    }
}

/// A source that was created from a stream.
///
/// This `struct` is created by the [`from_stream`] function.
#[pin_project]
#[derive(Debug)]
#[must_use = "sources do nothing unless polled"]
pub struct FromStream<S: Stream> {
    #[pin]
    stream: S,
    peeked: Option<S::Item>,
    done: bool,
}

impl<S: Stream> Source for FromStream<S> {
    type Item = S::Item;

    fn poll_ready(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        cancel.check()?;
        let this = self.project();
        if this.peeked.is_some() {
            return Poll::Ready(Ok(true));
        }
        if *this.done {
            return Poll::Ready(Ok(false));
        }
        match ready!(this.stream.poll_next(cx)) {
            Some(item) => {
                *this.peeked = Some(item);
                Poll::Ready(Ok(true))
            }
            None => {
                *this.done = true;
                Poll::Ready(Ok(false))
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
        match this.peeked.take() {
            Some(item) => Poll::Ready(Ok(item)),
            None if *this.done => Poll::Ready(Err(Error::SourceClosed)),
            None => Poll::Ready(Err(Error::InvalidProtocolUse(
                "read_value called before ready_to_read",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceExt;
    use futures_lite::future::block_on;
    use futures_lite::stream;

    #[test]
    fn pending_stream_suspends() {
        block_on(async {
            let cancel = CancelToken::new();
            let (tx, rx) = futures::channel::mpsc::unbounded();
            let mut s = from_stream(rx);
            let reader = async {
                let mut out = vec![];
                while s.ready_to_read(&cancel).await.unwrap() {
                    out.push(s.read_value(&cancel).await.unwrap());
                }
                out
            };
            let writer = async move {
                for n in 0..3 {
                    futures_lite::future::yield_now().await;
                    tx.unbounded_send(n).unwrap();
                }
            };
            let (out, ()) = futures_lite::future::zip(reader, writer).await;
            assert_eq!(out, vec![0, 1, 2]);
        })
    }

    #[test]
    fn fused_after_end() {
        block_on(async {
            let cancel = CancelToken::new();
            let mut s = from_stream(stream::once(1));
            assert!(s.ready_to_read(&cancel).await.unwrap());
            assert_eq!(s.read_value(&cancel).await.unwrap(), 1);
            assert!(!s.ready_to_read(&cancel).await.unwrap());
            assert!(!s.ready_to_read(&cancel).await.unwrap());
        })
    }
}
