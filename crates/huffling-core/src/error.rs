//! Error types for Huffman coding operations.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Codec error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Frequency table does not cover the full byte alphabet.
    #[error("frequency table must have 256 entries, got {len}")]
    InvalidFrequencyTable { len: usize },

    /// Destination too small for the computed compressed size.
    #[error("buffer too small: need {required} bytes, got {provided}")]
    BufferTooSmall { required: usize, provided: usize },

    /// A bit append would run past the bound buffer.
    #[error("bit overflow: appending {requested} bits with {available} bits left")]
    BitOverflow { requested: u64, available: u64 },

    /// Malformed argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Source ran out before the declared bit count was consumed.
    #[error("truncated stream: consumed {consumed} of {expected} bits")]
    TruncatedStream { consumed: u64, expected: u64 },

    /// Declared bit count does not end on a symbol boundary.
    #[error("misaligned stream: consumed {consumed} bits, expected exactly {expected}")]
    MisalignedStream { consumed: u64, expected: u64 },

    /// Decode output buffer filled before the stream ended.
    #[error("destination full after {capacity} bytes")]
    DestinationFull { capacity: usize },

    /// Tree, code table or decode table failed a structural check.
    #[error("corrupted tree: {0}")]
    CorruptedTree(String),

    /// Operation called before the state it depends on was built.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a buffer too small error.
    pub fn buffer_too_small(required: usize, provided: usize) -> Self {
        Error::BufferTooSmall { required, provided }
    }

    /// Create a bit overflow error.
    pub fn bit_overflow(requested: u64, available: u64) -> Self {
        Error::BitOverflow {
            requested,
            available,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    /// Create a truncated stream error.
    pub fn truncated(consumed: u64, expected: u64) -> Self {
        Error::TruncatedStream { consumed, expected }
    }

    /// Create a misaligned stream error.
    pub fn misaligned(consumed: u64, expected: u64) -> Self {
        Error::MisalignedStream { consumed, expected }
    }

    /// Create a corrupted tree error.
    pub fn corrupted_tree(message: impl Into<String>) -> Self {
        Error::CorruptedTree(message.into())
    }

    /// Create a corrupted tree error pointing at a node.
    pub fn corrupted_node(message: impl Into<String>, node: u16) -> Self {
        Error::CorruptedTree(format!("{} at node {}", message.into(), node))
    }

    /// Check if error is recoverable (can retry with different parameters).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::BufferTooSmall { .. } | Error::DestinationFull { .. }
        )
    }

    /// Get error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidFrequencyTable { .. } => "invalid_frequency_table",
            Error::BufferTooSmall { .. } => "buffer_too_small",
            Error::BitOverflow { .. } => "bit_overflow",
            Error::InvalidInput(_) => "invalid_input",
            Error::TruncatedStream { .. } => "truncated_stream",
            Error::MisalignedStream { .. } => "misaligned_stream",
            Error::DestinationFull { .. } => "destination_full",
            Error::CorruptedTree(_) => "corrupted_tree",
            Error::InvalidState { .. } => "invalid_state",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
        }
    }
}
