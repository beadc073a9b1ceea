use super::Source;

/// Conversion into a [`Source`].
///
/// By implementing `IntoSource` for a type, you define how it will be
/// converted to a source. Combinators which take collections of sources
/// accept anything which implements this trait.
pub trait IntoSource {
    /// The type of the elements being produced.
    type Item;

    /// Which kind of source are we turning this into?
    type IntoSource: Source<Item = Self::Item>;

    /// Creates a source from a value.
    fn into_source(self) -> Self::IntoSource;
}

impl<S: Source> IntoSource for S {
    type Item = S::Item;
    type IntoSource = S;

    #[inline]
    fn into_source(self) -> S {
        self
    }
}
