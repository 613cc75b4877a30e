use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lts_node::NodeType;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::channel::ChannelHandle;
use crate::pool::ChannelPool;
use crate::statistics::ChannelStatistics;
use crate::sweeper::SweeperHandle;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
/// Configuration for the channel manager.
pub struct ChannelManagerConfig {
    /// The time between each sweep of the channel pool.
    ///
    /// The first sweep happens one interval after the manager is started.
    pub sweep_interval: Duration,

    /// How long a single liveness probe may take before the channel
    /// is treated as closed.
    pub probe_timeout: Duration,
}

impl Default for ChannelManagerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl ChannelManagerConfig {
    /// Set the time between each sweep.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the liveness probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

/// Manages the live channels to job clients and task trackers.
///
/// Channels are grouped by node type and node group, only one channel is
/// kept per node identity. Once started, the manager periodically probes
/// every channel and evicts the ones which have closed.
///
/// Dropping the manager stops the background sweeper.
pub struct ChannelManager {
    config: ChannelManagerConfig,
    pool: Arc<ChannelPool>,
    running: AtomicBool,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelManager {
    /// Creates a new, stopped, channel manager with the default config.
    pub fn new() -> Self {
        Self::with_config(ChannelManagerConfig::default())
    }

    /// Creates a new, stopped, channel manager.
    pub fn with_config(config: ChannelManagerConfig) -> Self {
        Self {
            config,
            pool: Arc::new(ChannelPool::default()),
            running: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        }
    }

    #[inline]
    /// The config of the manager.
    pub fn config(&self) -> &ChannelManagerConfig {
        &self.config
    }

    #[inline]
    /// Gets the live channel statistics.
    pub fn statistics(&self) -> ChannelStatistics {
        self.pool.statistics.clone()
    }

    #[inline]
    /// Returns if the background sweeper is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts the background sweeper.
    ///
    /// This must be called from within a Tokio runtime. Calling it while
    /// the manager is already running does nothing. Failures are logged and
    /// leave the manager stopped.
    pub fn start(&self) {
        // The slot lock orders concurrent transitions, the flag is for lock-free reads.
        let mut slot = self.sweeper.lock();
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let spawned = SweeperHandle::spawn(
            self.pool.clone(),
            self.config.sweep_interval,
            self.config.probe_timeout,
        );

        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                info!(
                    sweep_interval = ?self.config.sweep_interval,
                    "Start channel manager success."
                );
            },
            Err(e) => {
                self.running.store(false, Ordering::Release);
                error!(error = ?e, "Start channel manager failed.");
            },
        }
    }

    /// Stops the background sweeper.
    ///
    /// This does not wait for a sweep which is already running.
    /// Calling it while the manager is stopped does nothing.
    pub fn stop(&self) {
        let mut slot = self.sweeper.lock();
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let result = match slot.take() {
            Some(handle) => handle.cancel(),
            None => Ok(()),
        };

        match result {
            Ok(()) => info!("Stop channel manager success."),
            Err(e) => warn!(error = ?e, "Stop channel manager failed."),
        }
    }

    /// Runs a single sweep over every channel, evicting the closed ones.
    ///
    /// Returns the number of channels evicted.
    pub async fn sweep(&self) -> usize {
        self.pool.sweep(self.config.probe_timeout).await
    }

    /// Adds a channel to the pool.
    ///
    /// Returns `false` if a channel with the same identity is already pooled,
    /// or if channels of the node's type are not pooled.
    pub fn offer(&self, channel: ChannelHandle) -> bool {
        self.pool.offer(channel)
    }

    /// Removes the channel with the same identity from the pool.
    ///
    /// Returns `false` if no channel was removed.
    pub fn remove(&self, channel: &ChannelHandle) -> bool {
        self.pool.remove(channel)
    }

    /// Gets the channel for a given node.
    pub fn get(
        &self,
        group: &str,
        node_type: NodeType,
        identity: &str,
    ) -> Option<ChannelHandle> {
        self.pool.get(group, node_type, identity)
    }

    /// Gets all channels for the given group and node type.
    pub fn get_all(&self, group: &str, node_type: NodeType) -> Vec<ChannelHandle> {
        self.pool.get_all(group, node_type)
    }

    /// The total number of pooled channels.
    pub fn num_channels(&self) -> usize {
        self.pool.len()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::Connection;

    #[derive(Clone, Default)]
    struct FlagConnection(Arc<AtomicBool>);

    #[async_trait]
    impl Connection for FlagConnection {
        async fn is_alive(&self) -> io::Result<bool> {
            Ok(!self.0.load(Ordering::Relaxed))
        }
    }

    struct HangingConnection;

    #[async_trait]
    impl Connection for HangingConnection {
        async fn is_alive(&self) -> io::Result<bool> {
            futures::future::pending().await
        }
    }

    /// A closed connection whose address lookup panics once armed.
    #[derive(Clone, Default)]
    struct ExplodingConnection(Arc<AtomicBool>);

    #[async_trait]
    impl Connection for ExplodingConnection {
        async fn is_alive(&self) -> io::Result<bool> {
            Ok(false)
        }

        fn remote_addr(&self) -> Option<std::net::SocketAddr> {
            if self.0.load(Ordering::Relaxed) {
                panic!("address lookup exploded");
            }
            None
        }
    }

    fn manager() -> ChannelManager {
        ChannelManager::with_config(
            ChannelManagerConfig::default()
                .with_sweep_interval(Duration::from_secs(10))
                .with_probe_timeout(Duration::from_millis(100)),
        )
    }

    #[test]
    fn test_start_outside_runtime_stays_stopped() {
        let manager = manager();
        manager.start();
        assert!(!manager.is_running());

        // Safe to stop something which never started.
        manager.stop();
        assert!(!manager.is_running());
    }

    #[test]
    fn test_stop_before_start() {
        let manager = manager();
        manager.stop();
        manager.stop();
        assert!(!manager.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_schedules_once() {
        let _ = tracing_subscriber::fmt::try_init();

        let manager = manager();
        manager.start();
        manager.start();
        assert!(manager.is_running());

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(manager.statistics().num_sweeps(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(manager.statistics().num_sweeps(), 2);

        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_sweeps() {
        let manager = manager();
        manager.start();
        manager.stop();
        assert!(!manager.is_running());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(manager.statistics().num_sweeps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let manager = manager();
        manager.start();
        manager.stop();
        manager.start();
        assert!(manager.is_running());

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(manager.statistics().num_sweeps(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_sweeper() {
        let manager = manager();
        let statistics = manager.statistics();
        manager.start();
        drop(manager);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(statistics.num_sweeps(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep_evicts_closed_channel() {
        let manager = manager();
        let closed = FlagConnection::default();
        manager.offer(ChannelHandle::new(
            "w1",
            NodeType::Worker,
            "g1",
            FlagConnection::default(),
        ));
        manager.offer(ChannelHandle::new("w2", NodeType::Worker, "g1", closed.clone()));
        manager.start();

        closed.0.store(true, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        let remaining = manager.get_all("g1", NodeType::Worker);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].identity(), "w1");
        assert_eq!(manager.num_channels(), 1);
        assert_eq!(manager.statistics().num_evicted(), 1);

        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_sweep_completes_but_is_not_rescheduled() {
        let _ = tracing_subscriber::fmt::try_init();

        let manager = manager();
        manager.offer(ChannelHandle::new("w1", NodeType::Worker, "g1", HangingConnection));
        manager.start();

        // The sweep begins at 10s and waits on the liveness check until it times out at 10.1s.
        tokio::time::sleep(Duration::from_millis(10_050)).await;
        assert_eq!(manager.statistics().num_sweeps(), 0);
        manager.stop();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.statistics().num_sweeps(), 1);
        assert_eq!(manager.statistics().num_evicted(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(manager.statistics().num_sweeps(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_on_tick_boundary_skips_pending_sweep() {
        for _ in 0..50 {
            let manager = manager();
            manager.start();

            tokio::time::sleep(Duration::from_secs(10)).await;
            manager.stop();
            let sweeps_at_stop = manager.statistics().num_sweeps();

            tokio::time::sleep(Duration::from_secs(30)).await;
            assert_eq!(manager.statistics().num_sweeps(), sweeps_at_stop);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_survives_panicking_sweep() {
        let _ = tracing_subscriber::fmt::try_init();

        let manager = manager();
        let exploding = ExplodingConnection::default();
        manager.offer(ChannelHandle::new("w1", NodeType::Worker, "g1", exploding.clone()));
        manager.start();

        exploding.0.store(true, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert!(manager.get("g1", NodeType::Worker, "w1").is_none());

        let closed = FlagConnection::default();
        manager.offer(ChannelHandle::new("w2", NodeType::Worker, "g1", closed.clone()));
        closed.0.store(true, Ordering::Relaxed);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(manager.is_running());
        assert!(manager.get("g1", NodeType::Worker, "w2").is_none());

        manager.stop();
    }
}
