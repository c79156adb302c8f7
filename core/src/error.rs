//! The facade error type.

use {hwbind_group::GroupError, hwbind_topology::TopologyError, std::io, thiserror::Error};

/// Errors surfaced by [`AffinityContext`](crate::AffinityContext)
/// operations.
///
/// Validation failures (`InvalidArgument`, `CallBeforeInit`,
/// `PopWithoutPush`, and out-of-range indices inside [`Topology`]) are
/// detected before any mutation and leave all state unchanged.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AffinityError {
    /// Unspecified failure
    #[error("operation failed")]
    Failed,

    /// The affinity provider rejected a get or set
    #[error("affinity system call failed: {0}")]
    Sys(io::Error),

    /// Bad lifecycle sequencing or bad parameters
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A query or command was issued before `init` completed
    #[error("called before init")]
    CallBeforeInit,

    /// Topology discovery or index validation failed
    #[error(transparent)]
    Topology(TopologyError),

    /// The collective exchange failed
    #[error(transparent)]
    Group(#[from] GroupError),

    /// Platform or feature not available
    #[error("operation is not supported on this platform")]
    NotSupported,

    /// `pop` was called without a matching `push`
    #[error("pop called without a matching push")]
    PopWithoutPush,
}

impl From<TopologyError> for AffinityError {
    /// Provider system-call failures and platform gaps keep their own
    /// kinds; everything else stays a topology error.
    fn from(err: TopologyError) -> Self {
        match err {
            TopologyError::Io(io) => AffinityError::Sys(io),
            TopologyError::NotSupported => AffinityError::NotSupported,
            other => AffinityError::Topology(other),
        }
    }
}
