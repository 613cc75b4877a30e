use std::env;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::NodeError;

pub static IDENTITY_ENV_KEY: &str = "LTS_NODE_IDENTITY";
pub static NODE_TYPE_ENV_KEY: &str = "LTS_NODE_TYPE";
pub static GROUP_ENV_KEY: &str = "LTS_NODE_GROUP";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
/// The role a process plays within the cluster.
pub enum NodeType {
    /// The administrative console, observes the entire cluster.
    Admin,
    /// A job coordinator which every other role must be able to reach.
    Tracker,
    /// A job submitting client.
    Client,
    /// A worker node executing tasks.
    Worker,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        NodeType::Admin,
        NodeType::Tracker,
        NodeType::Client,
        NodeType::Worker,
    ];

    #[inline]
    /// Returns if the role is only meaningful within a node group.
    ///
    /// Clients and workers only route to peers within the same group, admins
    /// and trackers are group-agnostic observers.
    pub fn is_grouped(&self) -> bool {
        matches!(self, NodeType::Client | NodeType::Worker)
    }

    /// The canonical name of the role as it is advertised to the cluster.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Admin => "JOB_ADMIN",
            NodeType::Tracker => "JOB_TRACKER",
            NodeType::Client => "JOB_CLIENT",
            NodeType::Worker => "TASK_TRACKER",
        }
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let node_type = match s.trim().to_ascii_uppercase().as_str() {
            "JOB_ADMIN" | "ADMIN" => NodeType::Admin,
            "JOB_TRACKER" | "TRACKER" => NodeType::Tracker,
            "JOB_CLIENT" | "CLIENT" => NodeType::Client,
            "TASK_TRACKER" | "WORKER" => NodeType::Worker,
            _ => return Err(NodeError::UnknownNodeType(s.to_string())),
        };

        Ok(node_type)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
/// A participant in the cluster.
///
/// Nodes are never mutated once discovered, a departing node is
/// represented by a removal event carrying the same identity.
pub struct Node {
    identity: String,
    node_type: NodeType,
    group: String,
}

impl Node {
    pub fn new(
        identity: impl Into<String>,
        node_type: NodeType,
        group: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            node_type,
            group: group.into(),
        }
    }

    #[inline]
    /// The globally unique identity of the process instance.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[inline]
    /// The role of the node.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    #[inline]
    /// The logical group the node belongs to.
    pub fn group(&self) -> &str {
        &self.group
    }

    #[inline]
    /// Returns if both nodes describe the same process instance.
    pub fn is_same_node(&self, other: &Node) -> bool {
        self.identity == other.identity
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node(identity={}, type={}, group={})",
            self.identity, self.node_type, self.group
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
/// The configuration of the local process.
///
/// This is supplied once when building the registries and is treated
/// as immutable for their lifetime.
pub struct NodeConfig {
    /// The unique identity of this process.
    pub identity: String,

    /// The role this process plays within the cluster.
    pub node_type: NodeType,

    /// The group this process belongs to.
    ///
    /// Admins and trackers still carry a group but it does not
    /// affect which nodes they observe.
    pub group: String,
}

impl NodeConfig {
    /// Creates a new node config.
    pub fn new(
        identity: impl Into<String>,
        node_type: NodeType,
        group: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            node_type,
            group: group.into(),
        }
    }

    /// Loads the config from the `LTS_NODE_IDENTITY`, `LTS_NODE_TYPE`
    /// and `LTS_NODE_GROUP` environment variables.
    pub fn from_env() -> Result<Self, NodeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, NodeError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let identity = lookup(IDENTITY_ENV_KEY)
            .ok_or(NodeError::MissingConfig(IDENTITY_ENV_KEY))?;
        let node_type = lookup(NODE_TYPE_ENV_KEY)
            .ok_or(NodeError::MissingConfig(NODE_TYPE_ENV_KEY))?
            .parse::<NodeType>()?;
        let group =
            lookup(GROUP_ENV_KEY).ok_or(NodeError::MissingConfig(GROUP_ENV_KEY))?;

        Ok(Self {
            identity,
            node_type,
            group,
        })
    }

    /// The node describing the local process.
    pub fn local_node(&self) -> Node {
        Node::new(self.identity.clone(), self.node_type, self.group.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_node_type_parse() {
        assert_eq!("JOB_ADMIN".parse::<NodeType>().unwrap(), NodeType::Admin);
        assert_eq!("tracker".parse::<NodeType>().unwrap(), NodeType::Tracker);
        assert_eq!(" job_client ".parse::<NodeType>().unwrap(), NodeType::Client);
        assert_eq!("TASK_TRACKER".parse::<NodeType>().unwrap(), NodeType::Worker);
        assert_eq!("Worker".parse::<NodeType>().unwrap(), NodeType::Worker);

        let err = "scheduler".parse::<NodeType>().unwrap_err();
        assert!(matches!(err, NodeError::UnknownNodeType(v) if v == "scheduler"));
    }

    #[test]
    fn test_node_type_display_parses_back() {
        for node_type in NodeType::ALL {
            assert_eq!(node_type.to_string().parse::<NodeType>().unwrap(), node_type);
        }
    }

    #[test]
    fn test_grouped_roles() {
        assert!(!NodeType::Admin.is_grouped());
        assert!(!NodeType::Tracker.is_grouped());
        assert!(NodeType::Client.is_grouped());
        assert!(NodeType::Worker.is_grouped());
    }

    #[test]
    fn test_node_display() {
        let node = Node::new("worker-1", NodeType::Worker, "g1");
        assert_eq!(
            node.to_string(),
            "Node(identity=worker-1, type=TASK_TRACKER, group=g1)"
        );
    }

    #[test]
    fn test_config_from_lookup() {
        let values = HashMap::from([
            (IDENTITY_ENV_KEY, "client-1".to_string()),
            (NODE_TYPE_ENV_KEY, "JOB_CLIENT".to_string()),
            (GROUP_ENV_KEY, "orders".to_string()),
        ]);

        let cfg = NodeConfig::from_lookup(|key| values.get(key).cloned()).unwrap();
        assert_eq!(cfg, NodeConfig::new("client-1", NodeType::Client, "orders"));
        assert_eq!(
            cfg.local_node(),
            Node::new("client-1", NodeType::Client, "orders")
        );
    }

    #[test]
    fn test_config_missing_value() {
        let values = HashMap::from([(IDENTITY_ENV_KEY, "client-1".to_string())]);

        let err = NodeConfig::from_lookup(|key| values.get(key).cloned()).unwrap_err();
        assert!(matches!(err, NodeError::MissingConfig(key) if key == NODE_TYPE_ENV_KEY));
    }

    #[test]
    fn test_config_bad_node_type() {
        let values = HashMap::from([
            (IDENTITY_ENV_KEY, "client-1".to_string()),
            (NODE_TYPE_ENV_KEY, "nope".to_string()),
            (GROUP_ENV_KEY, "orders".to_string()),
        ]);

        let err = NodeConfig::from_lookup(|key| values.get(key).cloned()).unwrap_err();
        assert!(matches!(err, NodeError::UnknownNodeType(_)));
    }
}
