use thiserror::Error;

/** Error kinds surfaced by the readers and the algorithms.

Algorithmic entry points never panic on expected failures; they return one
of these kinds and leave logging to the caller-facing layer. Bookkeeping
corruption is the exception: it aborts through debug assertions because
continuing would corrupt the search. */
#[derive(Debug, Error)]
pub enum Error {
    /// malformed instance file, unknown operator name, bad configuration
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// the instance (possibly under a restriction) cannot be covered
    #[error("instance {0} has no solution")]
    NoSolution(String),

    /// incremental bookkeeping diverged from its definition
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;
