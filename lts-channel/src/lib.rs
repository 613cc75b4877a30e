//! # LTS Channel
//! A continuously verified pool of connections to job clients and task trackers.
//!
//! The [ChannelManager] keeps at most one live channel per remote node, grouped by
//! the node's type and group, so job trackers can route work to a specific node or
//! to any node within a group. Channels die independently of the pool, a background
//! sweeper probes them at a fixed interval and evicts the ones which have closed.

mod channel;
mod error;
mod manager;
mod pool;
mod statistics;
mod sweeper;

pub use channel::{ChannelHandle, Connection};
pub use error::ChannelError;
pub use manager::{
    ChannelManager,
    ChannelManagerConfig,
    DEFAULT_PROBE_TIMEOUT,
    DEFAULT_SWEEP_INTERVAL,
};
pub use pool::POOLED_NODE_TYPES;
pub use statistics::ChannelStatistics;
