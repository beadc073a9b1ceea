use std::error::Error as StdError;

/// A type-erased error raised by caller-supplied functions.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A specialized [`Result`][core::result::Result] for source operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// The failures a [`Source`][crate::Source] surfaces to its consumer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The cancellation token was signaled.
    #[error("operation cancelled")]
    Cancelled,

    /// A value was read from a source that reported it has no more values.
    #[error("source closed")]
    SourceClosed,

    /// The two-step ready/read protocol was used out of order.
    #[error("invalid protocol use: {0}")]
    InvalidProtocolUse(&'static str),

    /// A caller-supplied mapping, binding or transducer function failed.
    #[error(transparent)]
    User(BoxError),
}

impl Error {
    /// Wrap a caller-supplied failure.
    pub fn user(err: impl Into<BoxError>) -> Self {
        Error::User(err.into())
    }

    /// Returns `true` if this is [`Error::Cancelled`].
    #[must_use]
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns `true` if this is [`Error::SourceClosed`].
    #[must_use]
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::SourceClosed)
    }

    /// Returns a reference to the caller's error if it is of type `E`.
    pub fn downcast_user<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Error::User(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom {0}")]
    struct Boom(u8);

    #[test]
    fn user_error_is_transparent() {
        let err = Error::user(Boom(7));
        assert_eq!(err.to_string(), "boom 7");
        assert_eq!(err.downcast_user::<Boom>().map(|b| b.0), Some(7));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn protocol_errors_display() {
        assert_eq!(Error::Cancelled.to_string(), "operation cancelled");
        assert_eq!(Error::SourceClosed.to_string(), "source closed");
        assert!(Error::InvalidProtocolUse("read before ready")
            .to_string()
            .ends_with("read before ready"));
        assert!(Error::SourceClosed.downcast_user::<Boom>().is_none());
        assert!(Error::SourceClosed.is_closed());
        assert!(!Error::Cancelled.is_closed());
        assert!(Error::Cancelled.is_cancelled());
    }
}
