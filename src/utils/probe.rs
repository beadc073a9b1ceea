//! A source which records every call made to it.

use core::pin::Pin;
use core::task::{Context, Poll};
use std::cell::Cell;
use std::rc::Rc;

use crate::source::Source;
use crate::{CancelToken, Result};

/// Shared call counters for a [`Probe`].
#[derive(Debug, Default, Clone)]
pub(crate) struct Calls {
    ready: Rc<Cell<usize>>,
    read: Rc<Cell<usize>>,
}

impl Calls {
    pub(crate) fn ready(&self) -> usize {
        self.ready.get()
    }

    pub(crate) fn read(&self) -> usize {
        self.read.get()
    }

    pub(crate) fn total(&self) -> usize {
        self.ready() + self.read()
    }
}

/// Always ready, always yields `value`, and counts calls. It deliberately
/// ignores the cancellation token so that any call made on a cancelled path
/// is visible.
#[derive(Debug)]
pub(crate) struct Probe<T> {
    value: T,
    calls: Calls,
}

impl<T: Clone> Probe<T> {
    pub(crate) fn new(value: T) -> (Self, Calls) {
        let calls = Calls::default();
        (
            Self {
                value,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl<T> Unpin for Probe<T> {}

impl<T: Clone> Source for Probe<T> {
    type Item = T;

    fn poll_ready(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _cancel: &CancelToken,
    ) -> Poll<Result<bool>> {
        self.calls.ready.set(self.calls.ready.get() + 1);
        Poll::Ready(Ok(true))
    }

    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _cancel: &CancelToken,
    ) -> Poll<Result<Self::Item>> {
        self.calls.read.set(self.calls.read.get() + 1);
        Poll::Ready(Ok(self.value.clone()))
    }
}
