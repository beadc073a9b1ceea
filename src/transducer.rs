//! Per-value transformation steps for [`Transform`][crate::source::Transform].
//!
//! A [`Transducer`] sees every upstream value once and decides, per value,
//! whether to yield zero or one downstream values and whether to keep
//! consuming upstream. This is how N:1 and N:0 ratios between upstream and
//! downstream values are expressed.
//!
//! Any `FnMut(In) -> Result<Step<Out>>` closure is a transducer:
//!
//! ```
//! use source_concurrency::prelude::*;
//! use source_concurrency::{source, CancelToken, Step};
//! use futures_lite::future::block_on;
//!
//! block_on(async {
//!     // Sum pairs of values.
//!     let mut pending = None;
//!     let s = source::from_iter(1..=6).transform(move |n: i32| {
//!         Ok::<_, source_concurrency::Error>(match pending.take() {
//!             None => {
//!                 pending = Some(n);
//!                 Step::Continue(None)
//!             }
//!             Some(m) => Step::Continue(Some(m + n)),
//!         })
//!     });
//!     let out: Vec<_> = s.collect(&CancelToken::new()).await.unwrap();
//!     assert_eq!(out, vec![3, 7, 11]);
//! })
//! ```

use crate::Result;

/// The outcome of feeding one value to a [`Transducer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Step<T> {
    /// Keep consuming upstream, yielding the value if there is one.
    Continue(Option<T>),
    /// Stop consuming upstream after yielding the value if there is one.
    Stop(Option<T>),
}

impl<T> Step<T> {
    /// Returns `true` if this is a [`Step::Stop`].
    pub fn is_stop(&self) -> bool {
        matches!(self, Step::Stop(_))
    }

    /// Map the yielded value, keeping the control decision.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Step<U> {
        match self {
            Step::Continue(v) => Step::Continue(v.map(f)),
            Step::Stop(v) => Step::Stop(v.map(f)),
        }
    }

    /// Split into the control decision and the yielded value.
    pub fn into_parts(self) -> (bool, Option<T>) {
        match self {
            Step::Continue(v) => (false, v),
            Step::Stop(v) => (true, v),
        }
    }
}

/// A stateful step from upstream values to optional downstream values.
pub trait Transducer<In> {
    /// Values yielded downstream.
    type Out;

    /// Feed one upstream value.
    ///
    /// A failure is surfaced to the consumer verbatim.
    fn step(&mut self, input: In) -> Result<Step<Self::Out>>;

    /// Returns `true` once the transducer will not accept further input, so
    /// that no upstream value is pulled for nothing.
    fn completed(&self) -> bool {
        false
    }

    /// Feed the output of this transducer into `next`.
    fn then<T>(self, next: T) -> Then<Self, T>
    where
        Self: Sized,
        T: Transducer<Self::Out>,
    {
        Then {
            first: self,
            second: next,
        }
    }
}

impl<In, Out, F> Transducer<In> for F
where
    F: FnMut(In) -> Result<Step<Out>>,
{
    type Out = Out;

    fn step(&mut self, input: In) -> Result<Step<Out>> {
        self(input)
    }
}

/// Two transducers run back to back.
///
/// This `struct` is created by the [`then`][Transducer::then] method.
#[derive(Debug, Clone)]
pub struct Then<A, B> {
    first: A,
    second: B,
}

impl<In, A, B> Transducer<In> for Then<A, B>
where
    A: Transducer<In>,
    B: Transducer<A::Out>,
{
    type Out = B::Out;

    fn step(&mut self, input: In) -> Result<Step<Self::Out>> {
        let (stop, value) = self.first.step(input)?.into_parts();
        let step = match value {
            Some(value) => self.second.step(value)?,
            None => Step::Continue(None),
        };
        Ok(match step {
            Step::Continue(out) if stop => Step::Stop(out),
            step => step,
        })
    }

    fn completed(&self) -> bool {
        self.first.completed() || self.second.completed()
    }
}

/// Apply `f` to every value.
pub fn map<F>(f: F) -> Map<F> {
    Map { f }
}

/// See [`map`].
#[derive(Debug, Clone)]
pub struct Map<F> {
    f: F,
}

impl<In, Out, F> Transducer<In> for Map<F>
where
    F: FnMut(In) -> Out,
{
    type Out = Out;

    fn step(&mut self, input: In) -> Result<Step<Out>> {
        Ok(Step::Continue(Some((self.f)(input))))
    }
}

/// Only pass values for which `predicate` returns `true`.
pub fn filter<P>(predicate: P) -> Filter<P> {
    Filter { predicate }
}

/// See [`filter`].
#[derive(Debug, Clone)]
pub struct Filter<P> {
    predicate: P,
}

impl<In, P> Transducer<In> for Filter<P>
where
    P: FnMut(&In) -> bool,
{
    type Out = In;

    fn step(&mut self, input: In) -> Result<Step<In>> {
        let keep = (self.predicate)(&input);
        Ok(Step::Continue(keep.then_some(input)))
    }
}

/// Map and filter in one step.
pub fn filter_map<F>(f: F) -> FilterMap<F> {
    FilterMap { f }
}

/// See [`filter_map`].
#[derive(Debug, Clone)]
pub struct FilterMap<F> {
    f: F,
}

impl<In, Out, F> Transducer<In> for FilterMap<F>
where
    F: FnMut(In) -> Option<Out>,
{
    type Out = Out;

    fn step(&mut self, input: In) -> Result<Step<Out>> {
        Ok(Step::Continue((self.f)(input)))
    }
}

/// Pass at most `n` values.
pub fn take(n: usize) -> Take {
    Take { remaining: n }
}

/// See [`take`].
#[derive(Debug, Clone)]
pub struct Take {
    remaining: usize,
}

impl<In> Transducer<In> for Take {
    type Out = In;

    fn step(&mut self, input: In) -> Result<Step<In>> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            Ok(Step::Stop(Some(input)))
        } else {
            Ok(Step::Continue(Some(input)))
        }
    }

    fn completed(&self) -> bool {
        self.remaining == 0
    }
}

/// Drop the first `n` values.
pub fn skip(n: usize) -> Skip {
    Skip { remaining: n }
}

/// See [`skip`].
#[derive(Debug, Clone)]
pub struct Skip {
    remaining: usize,
}

impl<In> Transducer<In> for Skip {
    type Out = In;

    fn step(&mut self, input: In) -> Result<Step<In>> {
        if self.remaining > 0 {
            self.remaining -= 1;
            Ok(Step::Continue(None))
        } else {
            Ok(Step::Continue(Some(input)))
        }
    }
}

/// Pass values while `predicate` holds, then stop.
pub fn take_while<P>(predicate: P) -> TakeWhile<P> {
    TakeWhile { predicate }
}

/// See [`take_while`].
#[derive(Debug, Clone)]
pub struct TakeWhile<P> {
    predicate: P,
}

impl<In, P> Transducer<In> for TakeWhile<P>
where
    P: FnMut(&In) -> bool,
{
    type Out = In;

    fn step(&mut self, input: In) -> Result<Step<In>> {
        if (self.predicate)(&input) {
            Ok(Step::Continue(Some(input)))
        } else {
            Ok(Step::Stop(None))
        }
    }
}

/// Thread `state` through every value. Returning `None` from `f` stops.
pub fn scan<St, F>(state: St, f: F) -> Scan<St, F> {
    Scan { state, f }
}

/// See [`scan`].
#[derive(Debug, Clone)]
pub struct Scan<St, F> {
    state: St,
    f: F,
}

impl<In, Out, St, F> Transducer<In> for Scan<St, F>
where
    F: FnMut(&mut St, In) -> Option<Out>,
{
    type Out = Out;

    fn step(&mut self, input: In) -> Result<Step<Out>> {
        Ok(match (self.f)(&mut self.state, input) {
            Some(out) => Step::Continue(Some(out)),
            None => Step::Stop(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<T: Transducer<u32>>(mut t: T, input: impl IntoIterator<Item = u32>) -> Vec<T::Out> {
        let mut out = vec![];
        for n in input {
            if t.completed() {
                break;
            }
            let (stop, value) = t.step(n).unwrap().into_parts();
            out.extend(value);
            if stop {
                break;
            }
        }
        out
    }

    #[test]
    fn take_stops_on_the_last_value() {
        assert_eq!(run(take(2), 0..10), vec![0, 1]);
        assert!(Transducer::<u32>::completed(&take(0)));
    }

    #[test]
    fn skip_then_take() {
        assert_eq!(run(Transducer::<u32>::then(skip(3), take(2)), 0..10), vec![3, 4]);
    }

    #[test]
    fn filter_map_and_scan() {
        let evens = filter(|n: &u32| n % 2 == 0);
        assert_eq!(run(evens, 0..6), vec![0, 2, 4]);

        let halves = filter_map(|n: u32| (n % 2 == 0).then_some(n / 2));
        assert_eq!(run(halves, 0..6), vec![0, 1, 2]);

        let sums = scan(0, |acc: &mut u32, n: u32| {
            *acc += n;
            (*acc < 6).then_some(*acc)
        });
        assert_eq!(run(sums, 1..10), vec![1, 3]);
    }

    #[test]
    fn take_while_stops_without_yielding() {
        let t = take_while(|n: &u32| *n < 3);
        assert_eq!(run(t, 0..10), vec![0, 1, 2]);
    }

    #[test]
    fn step_keeps_its_decision_when_mapped() {
        let step = Step::Stop(Some(2)).map(|n: u32| n + 1);
        assert!(step.is_stop());
        assert_eq!(step.into_parts(), (true, Some(3)));
        assert!(!Step::Continue(None::<u32>).map(|n| n * 2).is_stop());
    }

    #[test]
    fn stop_propagates_through_then() {
        let mut t = Transducer::<u32>::then(take(1), map(|n: u32| n * 10));
        assert_eq!(t.step(4).unwrap(), Step::Stop(Some(40)));
        assert!(Transducer::<u32>::completed(&t));
    }
}
