// Activate some of the Rust 2024 lints to make the future migration easier.
#![warn(if_let_rescope)]
#![warn(keyword_idents_2024)]
#![warn(missing_unsafe_on_extern)]
#![warn(rust_2024_guarded_string_incompatible_syntax)]
#![warn(rust_2024_incompatible_pat)]
#![warn(unsafe_attr_outside_unsafe)]
#![warn(unsafe_op_in_unsafe_fn)]

//! Stack-disciplined CPU-binding management for distributed jobs.
//!
//! A process that is one member of a larger job constructs an
//! [`AffinityContext`], initializes it against its [`ProcessGroup`]
//! (a blocking, collective step that discovers the hardware hierarchy and
//! agrees on node/rank placement with the rest of the group), then queries
//! its placement and temporarily narrows its CPU binding with
//! [`bind_push`](AffinityContext::bind_push) /
//! [`bind_pop`](AffinityContext::bind_pop) (strict LIFO, restoring the
//! prior binding exactly) or permanently with
//! [`rebind`](AffinityContext::rebind).
//!
//! Binding commands on one context must be serialized by the caller; the
//! context provides no internal locking.

mod config;
mod context;
mod error;
mod guard;
mod stack;

pub use {
    config::{ContextConfig, FingerprintSource},
    context::AffinityContext,
    error::AffinityError,
    guard::BindGuard,
};
// The seams a context is wired to, re-exported for callers.
pub use {
    hwbind_group::{NodeRankInfo, ProcessGroup, SingleProcessGroup},
    hwbind_topology::{CpuSet, HostProvider, ObjectType},
};

/// API major version. Queryable at any time, before any context exists.
pub const API_VERSION: u32 = 1;
/// API minor version.
pub const API_SUBVERSION: u32 = 0;

/// The (major, minor) version of this API.
pub const fn api_version() -> (u32, u32) {
    (API_VERSION, API_SUBVERSION)
}
