use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live metrics around the subscribed node set.
pub struct MembershipStatistics(Arc<MembershipStatisticsInner>);

impl Deref for MembershipStatistics {
    type Target = MembershipStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct MembershipStatisticsInner {
    /// The number of nodes accepted by the visibility policy.
    pub(crate) num_accepted: Counter,
    /// The number of nodes dropped by the visibility policy.
    pub(crate) num_rejected: Counter,
    /// The number of node entries removed from the set.
    pub(crate) num_removed: Counter,
}

impl MembershipStatisticsInner {
    /// The number of nodes accepted by the visibility policy.
    pub fn num_accepted(&self) -> u64 {
        self.num_accepted.load(Ordering::Relaxed)
    }

    /// The number of nodes dropped by the visibility policy.
    pub fn num_rejected(&self) -> u64 {
        self.num_rejected.load(Ordering::Relaxed)
    }

    /// The number of node entries removed from the set.
    pub fn num_removed(&self) -> u64 {
        self.num_removed.load(Ordering::Relaxed)
    }
}
