//! Error types for the netmond daemon framework.

use thiserror::Error;

/// Errors that can occur while capturing or recording packets.
#[derive(Debug, Error)]
pub enum NetmondError {
    /// Redis connection or command failed.
    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Batch submission was rejected by the record store.
    #[error("batch submission failed: {0}")]
    Submit(String),

    /// Capture facility (pcap) failed.
    #[error("capture error: {0}")]
    Capture(#[from] pcap::Error),

    /// All capture threads stopped; no further packets will arrive.
    #[error("capture stopped: {0}")]
    CaptureStopped(String),

    /// A protocol-analyzer worker callback failed for one packet.
    #[error("worker {worker} failed: {reason}")]
    Worker { worker: String, reason: String },

    /// Neither environment nor configuration directory yielded a valid secret.
    #[error("secret not found: {0}")]
    SecretNotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetmondError {
    /// Creates a worker-callback error.
    pub fn worker(worker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Worker {
            worker: worker.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for netmond operations.
pub type Result<T> = std::result::Result<T, NetmondError>;
