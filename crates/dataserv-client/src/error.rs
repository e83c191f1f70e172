//! Error types for the farmer client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur in the client
#[derive(Debug, Error)]
pub enum ClientError {
    /// No client address configured
    #[error("Required argument: address")]
    AddressRequired,

    /// Rejected argument value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Coordinator answered 409
    #[error("Address {address} already registered at {url}")]
    AddressAlreadyRegistered { address: String, url: String },

    /// Coordinator answered 404
    #[error("Farmer not found at {0}")]
    FarmerNotFound(String),

    /// Coordinator answered 400
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Coordinator answered 500
    #[error("Farmer error at {0}")]
    FarmerError(String),

    /// Coordinator answered with an unmapped status
    #[error("Unexpected response status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Coordinator unreachable after all retries
    #[error("Could not connect to {0}")]
    ConnectionError(String),

    /// Shard engine error
    #[error("Core error: {0}")]
    Core(#[from] dataserv_core::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background build task failed to complete
    #[error("Build task failed: {0}")]
    Task(String),
}
