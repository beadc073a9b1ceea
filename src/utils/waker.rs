use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Wake;

/// A waker which only counts how often it was woken.
#[derive(Debug)]
pub(crate) struct DummyWaker {
    count: Arc<AtomicUsize>,
}

impl DummyWaker {
    pub(crate) fn counting(count: Arc<AtomicUsize>) -> Self {
        Self { count }
    }
}

impl Wake for DummyWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
