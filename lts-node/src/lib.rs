//! # LTS Node
//! The cluster membership view of a single LTS process.
//!
//! Every process in the cluster plays one of four roles, admin consoles, job trackers,
//! job clients and task trackers (workers). Which other nodes a process needs to know about
//! depends on its role, the [SubscribedNodes] set applies that visibility policy to the
//! membership changes delivered by an external watcher and answers queries by role and group.

mod error;
mod listener;
mod node;
mod statistics;
mod subscribed;

pub use error::NodeError;
pub use listener::{watch_node_changes, NodeChange, NodeChangeListener};
pub use node::{
    Node,
    NodeConfig,
    NodeType,
    GROUP_ENV_KEY,
    IDENTITY_ENV_KEY,
    NODE_TYPE_ENV_KEY,
};
pub use statistics::MembershipStatistics;
pub use subscribed::SubscribedNodes;
