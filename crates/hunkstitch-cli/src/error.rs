//! The CLI's own error type. Unlike the core, which never touches a
//! filesystem and therefore never needs to wrap I/O, this binary does both
//! and follows the core's `thiserror` shape for it: flat variants, one
//! `#[error("...")]` message each, `#[from]` only for the genuine I/O and
//! deserialization causes this layer introduces.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("failed to start the timeout runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("apply did not finish within {0}s")]
    Timeout(u64),

    #[error("the worker thread running apply panicked: {0}")]
    Worker(#[source] tokio::task::JoinError),
}
