/// Errors produced by a [DataLoader](super::DataLoader).
///
/// `E` is the error type of the underlying [Loader](super::Loader). Every
/// variant is cloneable because a single failure may be delivered to many
/// callers sharing the same future.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error<E> {
    #[error("The load method requires a key")]
    InvalidKey,

    #[error("load_many must be called with a collection of keys")]
    InvalidArgument,

    #[error("Batch load function violated its contract: {0}")]
    BatchFunctionContract(String),

    #[error(
        "Batch load function must resolve a list of the same length as the list of keys. \
         Expected {expected} values, received {actual}"
    )]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Batch load failed: {0}")]
    Batch(E),

    #[error("{0}")]
    Upstream(E),

    #[error("Dispatch was dropped before the result was settled")]
    Canceled,
}

impl<E> Error<E> {
    /// Returns `true` for failures that affected a whole dispatch cycle.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            Error::BatchFunctionContract(_)
                | Error::ShapeMismatch { .. }
                | Error::Batch(_)
                | Error::Canceled
        )
    }
}

pub type Result<A, E> = std::result::Result<A, Error<E>>;
