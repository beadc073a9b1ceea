use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll, Waker};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use smallvec::SmallVec;

use crate::{Error, Result};

/// A cooperative cancellation signal shared by every operation in a
/// composition.
///
/// Cloning a token is cheap and every clone observes the same signal. Once
/// cancelled a token stays cancelled.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    state: Mutex<State>,
}

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    wakers: SmallVec<[Waker; 2]>,
    children: Vec<Weak<Inner>>,
    callbacks: Vec<Callback>,
}

impl CancelToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once [`cancel`][Self::cancel] has been called on this
    /// token or on a token it is attached to.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Fail with [`Error::Cancelled`] if the token has been signaled.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Signal cancellation, waking every registered task and cancelling all
    /// attached children. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        Inner::cancel(&self.inner);
    }

    /// Wake `waker` when this token is cancelled.
    ///
    /// If the token is already cancelled the waker is woken immediately.
    /// Registering a waker which would wake the same task as an already
    /// registered one is a no-op.
    pub fn register(&self, waker: &Waker) {
        let mut state = self.inner.state();
        if self.is_cancelled() {
            drop(state);
            waker.wake_by_ref();
            return;
        }
        if !state.wakers.iter().any(|w| w.will_wake(waker)) {
            state.wakers.push(waker.clone());
        }
    }

    /// Run `f` once this token is cancelled, on the thread calling
    /// [`cancel`][Self::cancel].
    ///
    /// If the token is already cancelled `f` runs immediately.
    pub fn on_cancel(&self, f: impl FnOnce() + Send + 'static) {
        let mut state = self.inner.state();
        if self.is_cancelled() {
            drop(state);
            f();
            return;
        }
        state.callbacks.push(Box::new(f));
    }

    /// Create a new token which is cancelled whenever this one is.
    ///
    /// Cancelling the child does not cancel the parent.
    pub fn child_token(&self) -> CancelToken {
        let child = CancelToken::new();
        self.attach(&child);
        child
    }

    /// Cancel `child` whenever this token is cancelled.
    ///
    /// The parent only holds a weak reference, so attaching does not keep the
    /// child's state alive.
    pub fn attach(&self, child: &CancelToken) {
        if Arc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        let mut state = self.inner.state();
        if self.is_cancelled() {
            drop(state);
            child.cancel();
            return;
        }
        state.children.retain(|c| c.strong_count() > 0);
        let weak = Arc::downgrade(&child.inner);
        if !state.children.iter().any(|c| c.ptr_eq(&weak)) {
            state.children.push(weak);
        }
    }

    /// Returns `true` if both handles refer to the same token.
    pub fn same_token(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A future which resolves once the token is cancelled.
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled { token: self }
    }
}

impl Inner {
    // A panicking waker cannot leave `State` half-updated.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(this: &Arc<Inner>) {
        if this.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let (wakers, children, callbacks) = {
            let mut state = this.state();
            (
                core::mem::take(&mut state.wakers),
                core::mem::take(&mut state.children),
                core::mem::take(&mut state.callbacks),
            )
        };
        for waker in wakers {
            waker.wake();
        }
        for f in callbacks {
            f();
        }
        for child in children.iter().filter_map(Weak::upgrade) {
            Inner::cancel(&child);
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A future which resolves once its token is cancelled.
///
/// This `struct` is created by the [`cancelled`] method on [`CancelToken`].
///
/// [`cancelled`]: CancelToken::cancelled
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Cancelled<'a> {
    token: &'a CancelToken,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.token.is_cancelled() {
            return Poll::Ready(());
        }
        self.token.register(cx.waker());
        // The token may have been cancelled between the check and the
        // registration; `register` wakes immediately in that case.
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::DummyWaker;
    use futures_lite::future::block_on;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn cancel_is_sticky_and_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        assert!(token.check().is_ok());
        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn cancel_wakes_registered_wakers_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let waker: Waker = Arc::new(DummyWaker::counting(count.clone())).into();
        let token = CancelToken::new();
        token.register(&waker);
        token.register(&waker);
        token.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Late registrations are woken straight away.
        token.register(&waker);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn children_follow_parent_but_not_the_reverse() {
        let parent = CancelToken::new();
        let child = parent.child_token();
        let grandchild = child.child_token();

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(grandchild.is_cancelled());

        let other = CancelToken::new();
        parent.attach(&other);
        parent.cancel();
        assert!(other.is_cancelled());

        let late = CancelToken::new();
        parent.attach(&late);
        assert!(late.is_cancelled());
    }

    #[test]
    fn attach_ignores_self_and_duplicates() {
        let token = CancelToken::new();
        token.attach(&token);
        let child = CancelToken::new();
        token.attach(&child);
        token.attach(&child.clone());
        assert_eq!(token.inner.state.lock().unwrap().children.len(), 1);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn callbacks_run_once_on_cancel() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancelToken::new();
        let child = token.child_token();
        for t in [&token, &child] {
            let count = count.clone();
            t.on_cancel(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        token.cancel();
        token.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let late = count.clone();
        token.on_cancel(move || {
            late.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn child_is_a_distinct_token() {
        let token = CancelToken::new();
        assert!(token.same_token(&token.clone()));
        assert!(!token.same_token(&token.child_token()));
    }

    #[test]
    fn cancelled_future_resolves() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = std::thread::spawn(move || remote.cancel());
        block_on(token.cancelled());
        handle.join().unwrap();
        assert!(token.is_cancelled());
    }
}
