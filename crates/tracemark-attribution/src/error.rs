use thiserror::Error;
use tracemark_codec::CodecError;
use tracemark_ledger::LedgerError;

#[derive(Debug, Error)]
pub enum AttributionError {
    #[error("carrier too small: need {required_bits} bits, have {available_bits}")]
    InsufficientCapacity { required_bits: u64, available_bits: u64 },

    #[error("malformed carrier: {0}")]
    MalformedCarrier(String),

    #[error("storage failure: {0}")]
    StorageFailure(#[from] LedgerError),

    #[error("no unused tracking code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<CodecError> for AttributionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InsufficientCapacity {
                required_bits,
                available_bits,
            } => Self::InsufficientCapacity {
                required_bits,
                available_bits,
            },
            CodecError::MalformedCarrier(reason) => Self::MalformedCarrier(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_errors_keep_their_detail() {
        let err: AttributionError = CodecError::InsufficientCapacity {
            required_bits: 104,
            available_bits: 48,
        }
        .into();
        assert!(matches!(
            err,
            AttributionError::InsufficientCapacity {
                required_bits: 104,
                available_bits: 48
            }
        ));
        assert_eq!(err.to_string(), "carrier too small: need 104 bits, have 48");
    }

    #[test]
    fn ledger_errors_become_storage_failures() {
        let err: AttributionError = LedgerError::LockPoisoned.into();
        assert!(matches!(err, AttributionError::StorageFailure(_)));
    }
}
