//! Pull-based asynchronous sources and their concurrency combinators.
//!
//! A [`Source`] is a possibly-exhausted, possibly-failing, possibly-asynchronous
//! producer of values, accessed one value at a time through two operations:
//! "is a value ready?" ([`SourceExt::ready_to_read`]) and, only after a `true`
//! answer, "give me the value" ([`SourceExt::read_value`]). Both take a
//! [`CancelToken`].
//!
//! Combinators are themselves sources which own and delegate to their children,
//! so composition is structural nesting. There is no scheduler: concurrency is
//! expressed purely through how a combinator waits on several children at once.
//!
//! # Examples
//!
//! Concatenate sources, then zip the result with a constant:
//!
//! ```rust
//! use source_concurrency::prelude::*;
//! use source_concurrency::{source, CancelToken};
//! use futures_lite::future::block_on;
//!
//! block_on(async {
//!     let cancel = CancelToken::new();
//!     let numbers = vec![source::once(1), source::once(2), source::once(3)].combine();
//!     let mut s = (numbers, source::forever("x")).zip();
//!
//!     let mut out = vec![];
//!     while s.ready_to_read(&cancel).await? {
//!         out.push(s.read_value(&cancel).await?);
//!     }
//!     assert_eq!(out, vec![(1, "x"), (2, "x"), (3, "x")]);
//!     Ok::<_, source_concurrency::Error>(())
//! })
//! .unwrap();
//! ```
//!
//! # Operations
//!
//! - [`source::Combine`]: run sources one after another, in order.
//! - [`source::Zip`]: pair up the k-th values of 2, 3 or 4 sources.
//! - [`SourceExt::choose`]: race two sources for readiness, falling back to the
//!   right-hand side when the left fails to produce.
//! - [`SourceExt::bind`] and [`SourceExt::try_bind`]: flat-map each value into a
//!   new source.
//! - [`SourceExt::transform`]: run values through a [`Transducer`].
//!
//! # Cancellation
//!
//! Every operation checks its token first and resolves to
//! [`Error::Cancelled`] without touching its children when the token is already
//! cancelled. Sources fed by a channel ([`source::from_channel`]) additionally
//! cancel and dispose the producer's [`Lifecycle`].

#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]
#![allow(non_snake_case)]

mod cancel;
mod error;
mod utils;

/// The source concurrency prelude.
pub mod prelude {
    pub use super::source::SourceExt as _;

    pub use super::source::Combine as _;
    pub use super::source::IntoSource as _;
    pub use super::source::Zip as _;
}

pub mod source;
pub mod transducer;

pub use cancel::{CancelToken, Cancelled};
pub use error::{BoxError, Error, Result};
pub use source::channel::{Environment, Lifecycle};
pub use source::{Source, SourceExt};
pub use transducer::{Step, Transducer};

/// Helper functions and types for tuples.
pub mod tuple {
    pub use crate::source::zip::tuple::{Zip2, Zip3, Zip4};
}

/// Helper functions and types for fixed-length arrays.
pub mod array {
    pub use crate::source::combine::array::Combine;
}

/// Helper functions and types for contiguous growable array type with heap-allocated contents,
/// written `Vec<T>`.
pub mod vec {
    pub use crate::source::combine::vec::Combine;
}
