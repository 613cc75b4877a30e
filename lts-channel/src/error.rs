use thiserror::Error;
use tokio::runtime::TryCurrentError;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Unable to schedule the channel sweeper: {0}")]
    /// The sweeper could not be spawned because no Tokio runtime is available.
    NoRuntime(#[from] TryCurrentError),

    #[error("The channel sweeper has already exited")]
    /// The sweeper task could not be signalled as it is no longer running.
    SweeperGone,
}
