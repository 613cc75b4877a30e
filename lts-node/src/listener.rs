use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, info};

use crate::node::Node;

/// A consumer of cluster membership changes.
///
/// This is what the external membership watcher drives, whenever it detects
/// nodes joining or leaving the cluster it delivers them as a batch.
pub trait NodeChangeListener: Send + Sync + 'static {
    /// A batch of nodes has joined the cluster.
    fn add_nodes(&self, nodes: &[Node]);

    /// A batch of nodes has left the cluster.
    fn remove_nodes(&self, nodes: &[Node]);
}

impl<L> NodeChangeListener for Arc<L>
where
    L: NodeChangeListener + ?Sized,
{
    fn add_nodes(&self, nodes: &[Node]) {
        self.as_ref().add_nodes(nodes)
    }

    fn remove_nodes(&self, nodes: &[Node]) {
        self.as_ref().remove_nodes(nodes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single membership change batch delivered over a channel.
pub enum NodeChange {
    Added(Vec<Node>),
    Removed(Vec<Node>),
}

impl NodeChange {
    /// Applies the change to the given listener.
    pub fn apply(&self, listener: &dyn NodeChangeListener) {
        match self {
            NodeChange::Added(nodes) => listener.add_nodes(nodes),
            NodeChange::Removed(nodes) => listener.remove_nodes(nodes),
        }
    }
}

/// Watches for membership changes and feeds them into the listener.
///
/// Batches are applied in the order they are received, the task exits
/// once every sender has been dropped.
pub async fn watch_node_changes<L>(
    watcher_id: Cow<'static, str>,
    listener: L,
    changes: flume::Receiver<NodeChange>,
) where
    L: NodeChangeListener,
{
    while let Ok(change) = changes.recv_async().await {
        match &change {
            NodeChange::Added(nodes) => info!(
                watcher_id = %watcher_id,
                num_nodes = nodes.len(),
                "Nodes have joined the cluster."
            ),
            NodeChange::Removed(nodes) => info!(
                watcher_id = %watcher_id,
                num_nodes = nodes.len(),
                "Nodes have left the cluster."
            ),
        }

        change.apply(&listener);
    }

    debug!(watcher_id = %watcher_id, "Membership change source closed, stopping watcher.");
}
