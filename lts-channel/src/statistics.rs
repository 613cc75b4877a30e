use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live metrics around the channel pool.
pub struct ChannelStatistics(Arc<ChannelStatisticsInner>);

impl Deref for ChannelStatistics {
    type Target = ChannelStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct ChannelStatisticsInner {
    /// The number of channels added to the pool.
    pub(crate) num_offered: Counter,
    /// The number of channels explicitly removed from the pool.
    pub(crate) num_removed: Counter,
    /// The number of closed channels evicted by a sweep.
    pub(crate) num_evicted: Counter,
    /// The number of completed sweeps.
    pub(crate) num_sweeps: Counter,
}

impl ChannelStatisticsInner {
    /// The number of channels added to the pool.
    pub fn num_offered(&self) -> u64 {
        self.num_offered.load(Ordering::Relaxed)
    }

    /// The number of channels explicitly removed from the pool.
    pub fn num_removed(&self) -> u64 {
        self.num_removed.load(Ordering::Relaxed)
    }

    /// The number of closed channels evicted by a sweep.
    pub fn num_evicted(&self) -> u64 {
        self.num_evicted.load(Ordering::Relaxed)
    }

    /// The number of completed sweeps.
    pub fn num_sweeps(&self) -> u64 {
        self.num_sweeps.load(Ordering::Relaxed)
    }
}
