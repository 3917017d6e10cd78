/// Errors from watermark embedding.
///
/// Extraction has no error type: every failure there is "no code found".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The carrier cannot hold the full message.
    #[error("insufficient capacity: need {required_bits} bits, carrier holds {available_bits}")]
    InsufficientCapacity {
        required_bits: u64,
        available_bits: u64,
    },

    /// The carrier bytes do not decode as the declared format.
    #[error("malformed carrier: {0}")]
    MalformedCarrier(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
