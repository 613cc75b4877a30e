use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;
use lts_node::NodeType;
use tokio::time::timeout;
use tracing::{debug, enabled, error, info, warn, Level};

use crate::channel::ChannelHandle;
use crate::statistics::ChannelStatistics;

/// The node types which have their channels pooled.
pub const POOLED_NODE_TYPES: [NodeType; 2] = [NodeType::Client, NodeType::Worker];

type ChannelMap = DashMap<String, Vec<ChannelHandle>>;

#[derive(Default)]
/// The channel buckets, keyed by node type and then by group.
pub(crate) struct ChannelPool {
    clients: ChannelMap,
    workers: ChannelMap,
    pub(crate) statistics: ChannelStatistics,
}

impl ChannelPool {
    fn channels_for(&self, node_type: NodeType) -> Option<&ChannelMap> {
        match node_type {
            NodeType::Client => Some(&self.clients),
            NodeType::Worker => Some(&self.workers),
            NodeType::Admin | NodeType::Tracker => None,
        }
    }

    pub(crate) fn offer(&self, channel: ChannelHandle) -> bool {
        let channels = match self.channels_for(channel.node_type()) {
            Some(channels) => channels,
            None => {
                debug!(
                    identity = %channel.identity(),
                    node_type = %channel.node_type(),
                    "Channel node type is not pooled, ignoring."
                );
                return false;
            },
        };

        let inserted = {
            let mut bucket = match channels.get_mut(channel.group()) {
                Some(bucket) => bucket,
                None => channels.entry(channel.group().to_string()).or_default(),
            };

            if bucket
                .iter()
                .any(|existing| existing.identity() == channel.identity())
            {
                false
            } else {
                bucket.push(channel.clone());
                true
            }
        };

        if inserted {
            self.statistics.num_offered.fetch_add(1, Ordering::Relaxed);
            info!(channel = %channel, "New connected channel.");
        }

        inserted
    }

    pub(crate) fn remove(&self, channel: &ChannelHandle) -> bool {
        let removed = self
            .channels_for(channel.node_type())
            .and_then(|channels| channels.get_mut(channel.group()))
            .map(|mut bucket| {
                let before = bucket.len();
                bucket.retain(|existing| existing.identity() != channel.identity());
                before != bucket.len()
            })
            .unwrap_or(false);

        if removed {
            self.statistics.num_removed.fetch_add(1, Ordering::Relaxed);
            info!(channel = %channel, "Removed channel.");
        }

        removed
    }

    pub(crate) fn get(
        &self,
        group: &str,
        node_type: NodeType,
        identity: &str,
    ) -> Option<ChannelHandle> {
        let bucket = self.channels_for(node_type)?.get(group)?;
        let channel = bucket
            .iter()
            .find(|channel| channel.identity() == identity)
            .cloned();
        channel
    }

    pub(crate) fn get_all(&self, group: &str, node_type: NodeType) -> Vec<ChannelHandle> {
        self.channels_for(node_type)
            .and_then(|channels| channels.get(group))
            .map(|bucket| bucket.clone())
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        POOLED_NODE_TYPES
            .iter()
            .filter_map(|node_type| self.channels_for(*node_type))
            .map(|channels| channels.iter().map(|bucket| bucket.len()).sum::<usize>())
            .sum()
    }

    /// Probes every pooled channel and evicts the ones which are closed.
    ///
    /// Buckets are snapshotted before probing, only channels which are still
    /// the exact same channel once the probes complete are removed. A node which
    /// reconnected while being probed keeps its new channel.
    pub(crate) async fn sweep(&self, probe_timeout: Duration) -> usize {
        let start = Instant::now();
        let mut num_evicted = 0;

        for node_type in POOLED_NODE_TYPES {
            let Some(channels) = self.channels_for(node_type) else {
                continue;
            };

            let snapshot = channels
                .iter()
                .map(|bucket| (bucket.key().clone(), bucket.value().clone()))
                .collect::<Vec<_>>();

            for (group, bucket) in snapshot {
                num_evicted += self
                    .sweep_bucket(channels, &group, bucket, probe_timeout)
                    .await;
            }
        }

        self.statistics.num_sweeps.fetch_add(1, Ordering::Relaxed);
        self.statistics
            .num_evicted
            .fetch_add(num_evicted as u64, Ordering::Relaxed);

        debug!(
            num_evicted = num_evicted,
            time_taken = ?start.elapsed(),
            "Channel sweep complete."
        );

        if enabled!(Level::DEBUG) {
            debug!(pool = ?self.describe(&self.clients), "JobClient channel pool.");
            debug!(pool = ?self.describe(&self.workers), "TaskTracker channel pool.");
        }

        num_evicted
    }

    async fn sweep_bucket(
        &self,
        channels: &ChannelMap,
        group: &str,
        bucket: Vec<ChannelHandle>,
        probe_timeout: Duration,
    ) -> usize {
        let probes = bucket
            .iter()
            .map(|channel| probe_channel(channel, probe_timeout));
        let alive = join_all(probes).await;
        let closed = alive
            .into_iter()
            .zip(bucket)
            .filter(|(alive, _)| !alive)
            .map(|(_, channel)| channel)
            .collect::<Vec<_>>();

        if closed.is_empty() {
            return 0;
        }

        let mut evicted = Vec::with_capacity(closed.len());
        if let Some(mut live_bucket) = channels.get_mut(group) {
            live_bucket.retain(|channel| {
                let is_closed = closed.iter().any(|c| c.same_channel(channel));
                if is_closed {
                    evicted.push(channel.clone());
                }
                !is_closed
            });
        }

        for channel in evicted.iter() {
            info!(channel = %channel, "Evicted closed channel.");
        }

        evicted.len()
    }

    fn describe(&self, channels: &ChannelMap) -> BTreeMap<String, Vec<String>> {
        channels
            .iter()
            .map(|bucket| {
                let identities = bucket
                    .iter()
                    .map(|channel| channel.identity().to_string())
                    .collect();
                (bucket.key().clone(), identities)
            })
            .collect()
    }
}

/// Checks if the channel is still usable.
///
/// A probe which errors, panics or does not complete within the timeout
/// marks the channel as closed.
async fn probe_channel(channel: &ChannelHandle, probe_timeout: Duration) -> bool {
    let probe = AssertUnwindSafe(channel.connection().is_alive()).catch_unwind();

    match timeout(probe_timeout, probe).await {
        Ok(Ok(Ok(alive))) => alive,
        Ok(Ok(Err(e))) => {
            warn!(
                channel = %channel,
                error = ?e,
                "Failed to probe channel, treating it as closed.",
            );
            false
        },
        Ok(Err(_)) => {
            error!(channel = %channel, "Channel probe panicked, treating it as closed.");
            false
        },
        Err(_) => {
            warn!(
                channel = %channel,
                probe_timeout = ?probe_timeout,
                "Channel probe timed out, treating it as closed.",
            );
            false
        },
    }
}
