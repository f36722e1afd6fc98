use thiserror::Error as ThisError;

/// Errors surfaced to callers of a loader.
///
/// `E` is the error type of the underlying [Loader](crate::Loader). It must be
/// `Clone` because one fetch failure is distributed to every caller waiting on
/// the same batch; wrap non-cloneable errors in an `Arc`.
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum Error<E> {
    // No `E: Display` bound here: loader error types are only required to be
    // `Clone`, so the payload is left for the caller to inspect.
    #[error("load failed")]
    Loader(E),

    #[error(
        "loader returned {} values and {} errors for {} keys",
        values,
        errors,
        keys
    )]
    MismatchedLengths {
        keys: usize,
        values: usize,
        errors: usize,
    },

    #[error("batch was dropped before delivering a result")]
    BatchAbandoned,
}

pub type Result<A, E> = std::result::Result<A, Error<E>>;
