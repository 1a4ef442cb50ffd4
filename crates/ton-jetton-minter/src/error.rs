//! Error types for jetton minter operations.

use thiserror::Error;

/// Errors that can occur while encoding metadata, building messages or
/// talking to a minter contract.
#[derive(Debug, Error)]
pub enum JettonError {
    /// Metadata key outside the supported field set.
    #[error("Unsupported metadata field: {0}")]
    UnsupportedField(String),

    /// Content cell does not start with the expected 0x00 tag.
    #[error("Invalid content prefix: 0x{0:02x} (expected 0x00)")]
    InvalidContentPrefix(u8),

    /// Invalid snake-encoded value.
    #[error("Invalid snake data: {0}")]
    InvalidSnakeData(String),

    /// Cell operation error.
    #[error("Cell error: {0}")]
    Cell(#[from] ton_cell::CellError),

    /// Get method execution failed.
    #[error("Get method failed with exit code: {0}")]
    GetMethodFailed(i32),

    /// Stack has insufficient entries.
    #[error("Stack underflow: expected {expected} entries, got {actual}")]
    StackUnderflow { expected: usize, actual: usize },

    /// Invalid stack entry type.
    #[error("Invalid stack entry type: expected {expected}, got {actual}")]
    InvalidStackEntry {
        expected: &'static str,
        actual: String,
    },

    /// Invalid address format.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Error reported by the contract provider.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for jetton minter operations.
pub type JettonResult<T> = Result<T, JettonError>;
