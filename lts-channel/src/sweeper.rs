use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error};

use crate::error::ChannelError;
use crate::pool::ChannelPool;

/// A handle to the running sweeper task.
///
/// Dropping the handle stops the sweeper.
pub(crate) struct SweeperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Spawns the sweeper on the current Tokio runtime.
    pub(crate) fn spawn(
        pool: Arc<ChannelPool>,
        sweep_interval: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let runtime = Handle::try_current()?;
        let (stop, stop_rx) = watch::channel(false);

        let task = runtime.spawn(channel_sweeper_task(
            pool,
            sweep_interval,
            probe_timeout,
            stop_rx,
        ));

        Ok(Self { stop, task })
    }

    /// Signals the sweeper to stop without waiting for it.
    ///
    /// A sweep which is already running completes but no further sweeps are run.
    pub(crate) fn cancel(self) -> Result<(), ChannelError> {
        if self.task.is_finished() {
            return Err(ChannelError::SweeperGone);
        }

        self.stop.send(true).map_err(|_| ChannelError::SweeperGone)
    }
}

/// A background task which evicts closed channels from the pool
/// every `sweep_interval`.
///
/// The first sweep happens one interval after the task starts. A stop signal
/// always wins over a pending tick, only a sweep which has already begun is
/// allowed to complete. A panicking sweep is logged and the next one still runs.
async fn channel_sweeper_task(
    pool: Arc<ChannelPool>,
    sweep_interval: Duration,
    probe_timeout: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = interval_at(Instant::now() + sweep_interval, sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = stop.changed() => break,
            _ = interval.tick() => {},
        }

        if *stop.borrow() {
            break;
        }

        let sweep = AssertUnwindSafe(pool.sweep(probe_timeout)).catch_unwind();
        if sweep.await.is_err() {
            error!("Channel sweep panicked, retrying next interval.");
        }

        if *stop.borrow() {
            break;
        }
    }

    debug!("Channel sweeper has stopped.");
}
