use super::Source;

pub(crate) mod tuple;

/// ‘Zips up’ multiple sources into a single source of tuples.
///
/// The k-th tuple holds the k-th value of every source. The zipped source is
/// exhausted as soon as any of its sources is.
pub trait Zip {
    /// What's the value type of our source?
    type Item;

    /// What source do we return?
    type Source: Source<Item = Self::Item>;

    /// Combine multiple sources into a single source.
    fn zip(self) -> Self::Source;
}
