use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::listener::NodeChangeListener;
use crate::node::{Node, NodeConfig, NodeType};
use crate::statistics::MembershipStatistics;

/// The set of nodes the local process has subscribed to.
///
/// Which nodes are kept depends on the role of the local process:
///
/// * Admins observe the entire cluster.
/// * Trackers are visible to every role.
/// * Trackers observe every role.
/// * Clients and workers only observe nodes of their own role within their own group.
///
/// Anything else is silently dropped as it is out of scope for this process.
///
/// Each role has its own bucket which is created on first use, concurrent
/// writers racing to create the same bucket always end up appending to the
/// same underlying bucket.
pub struct SubscribedNodes {
    config: NodeConfig,
    nodes: DashMap<NodeType, Vec<Node>>,
    statistics: MembershipStatistics,
}

impl SubscribedNodes {
    /// Creates a new, empty node set for the given local process.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            nodes: DashMap::with_capacity(NodeType::ALL.len()),
            statistics: MembershipStatistics::default(),
        }
    }

    #[inline]
    /// The config of the local process.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    #[inline]
    /// Gets the live membership statistics.
    pub fn statistics(&self) -> MembershipStatistics {
        self.statistics.clone()
    }

    /// Returns if the given node should be tracked by the local process.
    pub fn is_visible(&self, node: &Node) -> bool {
        match (self.config.node_type, node.node_type()) {
            (NodeType::Admin, _) => true,
            (_, NodeType::Tracker) => true,
            (NodeType::Tracker, _) => true,
            (local, incoming) => local == incoming && node.group() == self.config.group,
        }
    }

    /// Adds each node which passes the visibility policy.
    ///
    /// Duplicate identities are not checked here, they are cleaned up
    /// when the node is removed.
    pub fn add_nodes(&self, nodes: &[Node]) {
        for node in nodes {
            self.add_node(node);
        }
    }

    /// Removes every entry matching the identity of each given node.
    ///
    /// Nodes which are not part of the set are ignored.
    pub fn remove_nodes(&self, nodes: &[Node]) {
        for node in nodes {
            self.remove_node(node);
        }
    }

    /// Gets all nodes of the given type.
    pub fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<Node> {
        self.nodes
            .get(&node_type)
            .map(|bucket| bucket.clone())
            .unwrap_or_default()
    }

    /// Gets all nodes of the given type which belong to the given group.
    pub fn get_nodes_by_type_and_group(
        &self,
        node_type: NodeType,
        group: &str,
    ) -> Vec<Node> {
        self.nodes
            .get(&node_type)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|node| node.group() == group)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Gets every node across all roles.
    pub fn get_all_nodes(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        for node_type in NodeType::ALL {
            if let Some(bucket) = self.nodes.get(&node_type) {
                nodes.extend(bucket.iter().cloned());
            }
        }
        nodes
    }

    fn add_node(&self, node: &Node) {
        if !self.is_visible(node) {
            self.statistics.num_rejected.fetch_add(1, Ordering::Relaxed);
            debug!(
                self_identity = %self.config.identity,
                identity = %node.identity(),
                node_type = %node.node_type(),
                group = %node.group(),
                "Node is not visible to the local process, ignoring."
            );
            return;
        }

        self.nodes
            .entry(node.node_type())
            .or_default()
            .push(node.clone());

        self.statistics.num_accepted.fetch_add(1, Ordering::Relaxed);
        info!(
            self_identity = %self.config.identity,
            identity = %node.identity(),
            node_type = %node.node_type(),
            group = %node.group(),
            "Added node to subscribed set."
        );
    }

    fn remove_node(&self, node: &Node) {
        let num_removed = match self.nodes.get_mut(&node.node_type()) {
            None => return,
            Some(mut bucket) => {
                let before = bucket.len();
                bucket.retain(|existing| !existing.is_same_node(node));
                before - bucket.len()
            },
        };

        if num_removed == 0 {
            return;
        }

        self.statistics
            .num_removed
            .fetch_add(num_removed as u64, Ordering::Relaxed);
        info!(
            self_identity = %self.config.identity,
            identity = %node.identity(),
            node_type = %node.node_type(),
            group = %node.group(),
            num_entries = num_removed,
            "Removed node from subscribed set."
        );
    }
}

impl NodeChangeListener for SubscribedNodes {
    fn add_nodes(&self, nodes: &[Node]) {
        SubscribedNodes::add_nodes(self, nodes)
    }

    fn remove_nodes(&self, nodes: &[Node]) {
        SubscribedNodes::remove_nodes(self, nodes)
    }
}
