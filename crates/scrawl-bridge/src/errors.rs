//! Bridge error taxonomy.
//!
//! Four recoverable failure classes cross the host boundary as structured
//! results. Lifecycle misuse (unbalanced pin/unpin) has no variant here: the
//! [`Root`](crate::lifecycle::Root) guard makes it unrepresentable.

use std::fmt;

/// A recoverable bridge failure, reported to the host as an error result.
#[derive(Debug, Clone)]
pub enum BridgeError {
    /// A runtime entry point was never resolved. Fatal to the operation,
    /// not to the process.
    Uninitialized {
        /// Symbolic name of the missing entry point.
        entry_point: &'static str,
    },

    /// The embedded runtime signaled an exception during evaluate, run, or
    /// the background read.
    Evaluation {
        /// Diagnostic text captured from the runtime.
        message: String,
    },

    /// A serialized artifact could not be decoded: bad header, unknown tag,
    /// truncated buffer, or an unresolved symbolic reference.
    Format { message: String },

    /// A runtime value did not match the shape the codec expected.
    Decode {
        /// What the codec was decoding (e.g. "point tuple of 2 numbers").
        expected: &'static str,
        /// What the runtime actually produced.
        got: String,
    },
}

impl BridgeError {
    pub fn uninitialized(entry_point: &'static str) -> Self {
        BridgeError::Uninitialized { entry_point }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        BridgeError::Evaluation {
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        BridgeError::Format {
            message: message.into(),
        }
    }

    pub fn decode(expected: &'static str, got: impl Into<String>) -> Self {
        BridgeError::Decode {
            expected,
            got: got.into(),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Uninitialized { entry_point } => {
                write!(f, "runtime entry point `{}` is uninitialized", entry_point)
            }
            BridgeError::Evaluation { message } => {
                write!(f, "evaluation error: {}", message)
            }
            BridgeError::Format { message } => {
                write!(f, "image format error: {}", message)
            }
            BridgeError::Decode { expected, got } => {
                write!(f, "decode error: expected {}, got {}", expected, got)
            }
        }
    }
}

impl std::error::Error for BridgeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_diagnostics() {
        let err = BridgeError::uninitialized("runner/run");
        assert_eq!(
            err.to_string(),
            "runtime entry point `runner/run` is uninitialized"
        );

        let err = BridgeError::evaluation("stack overflow in turtle loop");
        assert!(err.to_string().starts_with("evaluation error:"));
        assert!(err.to_string().contains("turtle loop"));

        let err = BridgeError::decode("color tuple of 4 numbers", "string");
        assert_eq!(
            err.to_string(),
            "decode error: expected color tuple of 4 numbers, got string"
        );
    }
}
