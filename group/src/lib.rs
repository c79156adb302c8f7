// Activate some of the Rust 2024 lints to make the future migration easier.
#![warn(if_let_rescope)]
#![warn(keyword_idents_2024)]
#![warn(missing_unsafe_on_extern)]
#![warn(rust_2024_guarded_string_incompatible_syntax)]
#![warn(rust_2024_incompatible_pat)]
#![warn(unsafe_attr_outside_unsafe)]
#![warn(unsafe_op_in_unsafe_fn)]

//! Process-group communication seam and node/rank resolution.
//!
//! A distributed job is a set of cooperating processes, each with a unique
//! global rank. This crate defines the [`ProcessGroup`] capability the
//! affinity engine consumes (rank, size, and a blocking all-gather of
//! small fixed-size records) and implements the one-time resolution that
//! tells each process which other processes share its physical host.
//!
//! The resolver is the only blocking, collective part of the engine: every
//! member must call it for any member to complete.

mod error;
#[cfg(feature = "dev-context-only-utils")]
mod local;
mod resolver;

#[cfg(feature = "dev-context-only-utils")]
pub use local::LocalGroup;
pub use {
    error::GroupError,
    resolver::{fingerprint_of, node_fingerprint, resolve, NodeRankInfo},
};

/// The communication capability of a distributed job.
///
/// Ranks are dense: members are numbered `0..size()`. Collectives must be
/// issued by every member, in the same order; they block until the whole
/// group has participated.
pub trait ProcessGroup: Send + Sync {
    /// This member's global rank in `0..size()`.
    fn rank(&self) -> usize;

    /// Total number of members in the group.
    fn size(&self) -> usize;

    /// Blocking collective: contributes `payload` and returns every
    /// member's payload, indexed by global rank.
    fn all_gather(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>, GroupError>;

    /// Blocking collective: returns once every member has entered.
    fn barrier(&self) -> Result<(), GroupError>;
}

/// The degenerate group: one process, rank 0. The resolver over this group
/// yields one node with one noderank.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcessGroup;

impl SingleProcessGroup {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessGroup for SingleProcessGroup {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_gather(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>, GroupError> {
        Ok(vec![payload.to_vec()])
    }

    fn barrier(&self) -> Result<(), GroupError> {
        Ok(())
    }
}
