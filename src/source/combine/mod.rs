use super::Source;

pub(crate) mod array;
pub(crate) mod vec;

/// Takes multiple sources and creates a new source over all of them in
/// sequence.
///
/// Source `k + 1` is not touched until source `k` reports that it is
/// exhausted, and an exhausted source is never asked again.
pub trait Combine {
    /// What's the value type of our source?
    type Item;

    /// What source do we return?
    type Source: Source<Item = Self::Item>;

    /// Combine multiple sources into a single source.
    fn combine(self) -> Self::Source;
}
