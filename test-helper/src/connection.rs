use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lts_channel::{ChannelHandle, Connection};
use lts_node::NodeType;

const ALIVE: u8 = 0;
const CLOSED: u8 = 1;
const FAILING: u8 = 2;
const HANGING: u8 = 3;

static NEXT_PORT: AtomicU16 = AtomicU16::new(20_000);

#[derive(Clone)]
/// A connection whose liveness is controlled by the test.
///
/// Clones share the same state so a test can keep a copy and flip it
/// after handing the connection to the pool.
pub struct MockConnection {
    state: Arc<AtomicU8>,
    remote_addr: SocketAddr,
}

impl Default for MockConnection {
    fn default() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(ALIVE)),
            remote_addr: SocketAddr::from((
                Ipv4Addr::LOCALHOST,
                NEXT_PORT.fetch_add(1, Ordering::Relaxed),
            )),
        }
    }
}

impl MockConnection {
    /// The connection reports itself as closed.
    pub fn close(&self) {
        self.state.store(CLOSED, Ordering::Relaxed);
    }

    /// The liveness probe returns an IO error.
    pub fn fail(&self) {
        self.state.store(FAILING, Ordering::Relaxed);
    }

    /// The liveness probe never completes.
    pub fn hang(&self) {
        self.state.store(HANGING, Ordering::Relaxed);
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn is_alive(&self) -> io::Result<bool> {
        match self.state.load(Ordering::Relaxed) {
            ALIVE => Ok(true),
            CLOSED => Ok(false),
            FAILING => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
            _ => futures::future::pending().await,
        }
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        Some(self.remote_addr)
    }
}

/// Creates a channel backed by a new mock connection.
///
/// The returned connection controls the channel's liveness.
pub fn mock_channel(
    identity: &str,
    node_type: NodeType,
    group: &str,
) -> (ChannelHandle, MockConnection) {
    let connection = MockConnection::default();
    let channel = ChannelHandle::new(identity, node_type, group, connection.clone());
    (channel, connection)
}
