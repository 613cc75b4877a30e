//! # LTS
//! The cluster membership and connection registries of the LTS job scheduler.
//!
//! This is a convenience package which includes both registries:
//!
//! ### Features
//! - `lts_node` - The role-aware view of which cluster nodes a process should know about.
//! - `lts_channel` - The pool of live channels to job clients and task trackers.

#[cfg(feature = "lts-node")]
pub use lts_node as node;
#[cfg(feature = "lts-channel")]
pub use lts_channel as channel;
