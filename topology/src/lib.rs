// Activate some of the Rust 2024 lints to make the future migration easier.
#![warn(if_let_rescope)]
#![warn(keyword_idents_2024)]
#![warn(missing_unsafe_on_extern)]
#![warn(rust_2024_guarded_string_incompatible_syntax)]
#![warn(rust_2024_incompatible_pat)]
#![warn(unsafe_attr_outside_unsafe)]
#![warn(unsafe_op_in_unsafe_fn)]

//! Hardware topology discovery and CPU affinity primitives.
//!
//! This crate models the local host as an immutable hierarchy of hardware
//! objects (machine, NUMA node, socket, core, processing unit) and provides
//! the one seam to the operating system: the [`HostProvider`] trait, whose
//! real binding enumerates the host through sysfs and manipulates affinity
//! through `sched_getaffinity`/`sched_setaffinity`.
//!
//! # Platform Support
//!
//! Linux only. The provider returns [`TopologyError::NotSupported`] on
//! other platforms.
//!
//! # Examples
//!
//! ```no_run
//! use hwbind_topology::{HostProvider, ObjectType, SysfsProvider, TopologyModel};
//!
//! # fn main() -> Result<(), hwbind_topology::TopologyError> {
//! let provider = SysfsProvider::new();
//! let model = TopologyModel::build(provider.discover()?)?;
//! println!(
//!     "{} cores, {} pus",
//!     model.object_count(ObjectType::Core),
//!     model.object_count(ObjectType::Pu),
//! );
//! println!("{}", model.stringify());
//! # Ok(())
//! # }
//! ```

mod cpu_set;
mod error;
#[cfg(feature = "dev-context-only-utils")]
mod fake;
mod model;
mod provider;

#[cfg(feature = "dev-context-only-utils")]
pub use fake::FakeProvider;
pub use {
    cpu_set::CpuSet,
    error::TopologyError,
    model::{HardwareObject, ObjectType, TopologyModel},
    provider::{HostProvider, PuDescriptor, RawTopology, SysfsProvider},
};
