use std::fmt::{Debug, Display, Formatter};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use lts_node::{Node, NodeType};

#[async_trait]
/// A live transport connection to a remote node.
///
/// The channel pool never closes or mutates a connection, it only
/// observes whether it is still usable.
pub trait Connection: Send + Sync + 'static {
    /// Probes the connection to check if it is still usable.
    ///
    /// An error is treated the same as the connection being closed.
    async fn is_alive(&self) -> io::Result<bool>;

    /// The address of the remote peer, if known.
    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }
}

#[derive(Clone)]
/// A connection to a remote node along with the node's identity, type and group.
///
/// This handle is cheap to clone.
pub struct ChannelHandle {
    identity: Arc<str>,
    node_type: NodeType,
    group: Arc<str>,
    connection: Arc<dyn Connection>,
}

impl ChannelHandle {
    /// Creates a new channel handle for the given remote node.
    pub fn new(
        identity: impl AsRef<str>,
        node_type: NodeType,
        group: impl AsRef<str>,
        connection: impl Connection,
    ) -> Self {
        Self {
            identity: Arc::from(identity.as_ref()),
            node_type,
            group: Arc::from(group.as_ref()),
            connection: Arc::new(connection),
        }
    }

    /// Creates a new channel handle for the given node.
    pub fn for_node(node: &Node, connection: impl Connection) -> Self {
        Self::new(node.identity(), node.node_type(), node.group(), connection)
    }

    #[inline]
    /// The identity of the remote node.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[inline]
    /// The type of the remote node.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    #[inline]
    /// The group of the remote node.
    pub fn group(&self) -> &str {
        &self.group
    }

    #[inline]
    /// The underlying transport connection.
    pub fn connection(&self) -> &dyn Connection {
        self.connection.as_ref()
    }

    #[inline]
    /// Returns if both handles wrap the exact same connection.
    ///
    /// Two handles with the same identity are not necessarily the same channel,
    /// a node which reconnects produces a new handle with its old identity.
    pub fn same_channel(&self, other: &ChannelHandle) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.connection) as *const (),
            Arc::as_ptr(&other.connection) as *const (),
        )
    }

    /// The node this channel connects to.
    pub fn node(&self) -> Node {
        Node::new(self.identity.as_ref(), self.node_type, self.group.as_ref())
    }
}

impl Debug for ChannelHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("identity", &self.identity)
            .field("node_type", &self.node_type)
            .field("group", &self.group)
            .field("remote_addr", &self.connection.remote_addr())
            .finish()
    }
}

impl Display for ChannelHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Channel(identity={}, type={}, group={}",
            self.identity, self.node_type, self.group
        )?;

        if let Some(addr) = self.connection.remote_addr() {
            write!(f, ", addr={addr}")?;
        }

        write!(f, ")")
    }
}
