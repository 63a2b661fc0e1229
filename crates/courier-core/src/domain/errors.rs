//! Errors - 失敗の分類
//!
//! Failures fall into two groups:
//! - terminal for the message (`DecodeError`, `InvokeError::NotRegistered`):
//!   logged and dropped, no continuation fires.
//! - data (`ArgumentMismatch`, `Unrepresentable`, `Handler`): carried into
//!   the error-continuation chain as the first argument.
//!
//! `PublishError` belongs to the publish-back port and is surfaced to whoever
//! delivered the message.

use thiserror::Error;

/// A malformed envelope or a `TaskArg` whose value does not fit its tag.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Envelope(String),

    #[error("unknown argument type '{0}'")]
    UnknownType(String),

    #[error("value {value} cannot be decoded as '{type_tag}': {reason}")]
    InvalidValue {
        type_tag: String,
        value: serde_json::Value,
        reason: String,
    },
}

impl DecodeError {
    pub(crate) fn invalid(
        type_tag: impl Into<String>,
        value: &serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            type_tag: type_tag.into(),
            value: value.clone(),
            reason: reason.into(),
        }
    }
}

/// Failure of one invocation attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("task '{0}' is not registered")]
    NotRegistered(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("argument mismatch: {0}")]
    ArgumentMismatch(String),

    /// The handler returned a value that has no wire form.
    #[error("result is not representable: {0}")]
    Unrepresentable(String),

    /// The handler itself reported failure. Only the message survives.
    #[error("{0}")]
    Handler(String),
}

/// The publish-back interface rejected a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("broker is closed")]
    Closed,

    #[error("encode signature: {0}")]
    Encode(String),

    #[error("publish rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_displays_message_verbatim() {
        let err = InvokeError::Handler("disk full".to_string());
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn decode_error_is_transparent() {
        let decode = InvokeError::from(DecodeError::UnknownType("complex128".into()));
        assert_eq!(decode.to_string(), "unknown argument type 'complex128'");
    }

    #[test]
    fn mismatch_is_prefixed() {
        let err = InvokeError::ArgumentMismatch("expected 2 arguments, got 1".into());
        assert_eq!(err.to_string(), "argument mismatch: expected 2 arguments, got 1");
    }
}
