use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Unknown node type: {0:?}")]
    /// The provided value is not one of the four cluster roles.
    UnknownNodeType(String),

    #[error("Missing required configuration value: {0}")]
    /// A required configuration value was not provided.
    MissingConfig(&'static str),
}
