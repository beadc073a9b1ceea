use super::Zip as ZipTrait;
use crate::source::{IntoSource, Source};
use crate::{CancelToken, Error, Result};

use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};

use pin_project::pin_project;

macro_rules! impl_zip_tuple {
    ($mod_name:ident $StructName:ident $($F:ident=$idx:tt)+) => {
        mod $mod_name {
            #[pin_project::pin_project]
            pub(super) struct Sources<$($F,)+> { $(#[pin] pub(super) $F: $F),+ }

            pub(super) const LEN: usize = [$($idx),+].len();
        }

        /// A source that ‘zips up’ multiple sources into a single source of
        /// tuples.
        ///
        /// Every readiness check and every read is issued to all unsettled
        /// sources within a single poll, so independent latencies overlap
        /// instead of adding up. When every source answers immediately, no
        /// suspension happens at all.
        ///
        /// This `struct` is created by the [`zip`] method on the [`Zip`] trait. See its
        /// documentation for more.
        ///
        /// [`zip`]: crate::source::Zip::zip
        /// [`Zip`]: crate::source::Zip
        #[pin_project]
        #[must_use = "sources do nothing unless polled"]
        pub struct $StructName<$($F),+>
        where $(
            $F: Source,
        )+ {
            #[pin] sources: $mod_name::Sources<$($F,)+>,
            // `None` while a source's readiness is unsettled.
            ready: [Option<bool>; $mod_name::LEN],
            items: ($(Option<$F::Item>,)+),
            done: bool,
        }

        impl<$($F),+> fmt::Debug for $StructName<$($F),+>
        where $(
            $F: Source + fmt::Debug,
        )+ {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple("Zip")
                    $( .field(&self.sources.$F) )+ // Hides implementation detail of Sources struct
                    .finish()
            }
        }

        impl<$($F),+> Source for $StructName<$($F),+>
        where $(
            $F: Source,
        )+ {
            type Item = ($($F::Item,)+);

            fn poll_ready(
                self: Pin<&mut Self>,
                cx: &mut Context<'_>,
                cancel: &CancelToken,
            ) -> Poll<Result<bool>> {
                cancel.check()?;
                let this = self.project();
                if *this.done {
                    return Poll::Ready(Ok(false));
                }

                let mut sources = this.sources.project();
                $(
                    if this.ready[$idx].is_none() {
                        match sources.$F.as_mut().poll_ready(cx, cancel) {
                            Poll::Ready(Ok(ready)) => this.ready[$idx] = Some(ready),
                            Poll::Ready(Err(err)) => {
                                *this.done = true;
                                return Poll::Ready(Err(err));
                            }
                            Poll::Pending => {}
                        }
                    }
                    if this.ready[$idx] == Some(false) {
                        // One source is exhausted, so no further tuple can be
                        // completed.
                        *this.done = true;
                        return Poll::Ready(Ok(false));
                    }
                )+

                if this.ready.iter().all(|ready| *ready == Some(true)) {
                    Poll::Ready(Ok(true))
                } else {
                    Poll::Pending
                }
            }

            fn poll_read(
                self: Pin<&mut Self>,
                cx: &mut Context<'_>,
                cancel: &CancelToken,
            ) -> Poll<Result<Self::Item>> {
                cancel.check()?;
                let this = self.project();
                if !this.ready.iter().all(|ready| *ready == Some(true)) {
                    let err = if *this.done {
                        Error::SourceClosed
                    } else {
                        Error::InvalidProtocolUse("read_value called before ready_to_read")
                    };
                    return Poll::Ready(Err(err));
                }

                let mut sources = this.sources.project();
                $(
                    if this.items.$idx.is_none() {
                        match sources.$F.as_mut().poll_read(cx, cancel) {
                            Poll::Ready(Ok(item)) => this.items.$idx = Some(item),
                            Poll::Ready(Err(err)) => {
                                *this.done = true;
                                *this.ready = [None; $mod_name::LEN];
                                return Poll::Ready(Err(err));
                            }
                            Poll::Pending => {}
                        }
                    }
                )+

                if $( this.items.$idx.is_some() && )+ true {
                    if let ($(Some($F),)+) = core::mem::take(this.items) {
                        *this.ready = [None; $mod_name::LEN];
                        return Poll::Ready(Ok(($($F,)+)));
                    }
                }
                Poll::Pending
            }
        }

        impl<$($F),+> ZipTrait for ($($F,)+)
        where $(
            $F: IntoSource,
        )+ {
            type Item = ($($F::Item,)+);
            type Source = $StructName<$($F::IntoSource),+>;

            fn zip(self) -> Self::Source {
                let ($($F,)+): ($($F,)+) = self;
                $StructName {
                    sources: $mod_name::Sources { $($F: $F.into_source()),+ },
                    ready: [None; $mod_name::LEN],
                    items: ($(Option::<$F::Item>::None,)+),
                    done: false,
                }
            }
        }
    };
}

impl_zip_tuple! { zip2 Zip2 A=0 B=1 }
impl_zip_tuple! { zip3 Zip3 A=0 B=1 C=2 }
impl_zip_tuple! { zip4 Zip4 A=0 B=1 C=2 D=3 }
