//! Utilities to implement the different sources of this crate.

mod pin;

pub(crate) use pin::{get_pin_mut_from_array, get_pin_mut_from_vec};

#[cfg(test)]
mod waker;

#[cfg(test)]
pub(crate) use waker::DummyWaker;

#[cfg(test)]
pub(crate) mod probe;
