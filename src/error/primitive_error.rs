use serde_json::json;
use thiserror::Error;

use super::error_context::{ErrorCode, ErrorContext, ErrorSeverity};
use crate::cluster::handle::{LocalityId, PrimitiveHandle};

/// Primitive-level errors.
///
/// Every variant names the primitive it was raised by (its diagnostic label)
/// so a failure deep in a tree can be traced back to the offending node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrimitiveError {
    #[error("{primitive}: expected {expected} operand(s), got {actual}")]
    ArityMismatch {
        primitive: String,
        expected: String,
        actual: usize,
    },
    #[error("{primitive}: operand {position} must be {expected}, got {actual}")]
    TypeMismatch {
        primitive: String,
        position: usize,
        expected: String,
        actual: String,
    },
    #[error("{primitive}: shape {shape:?} {reason}")]
    ShapeMismatch {
        primitive: String,
        shape: Vec<usize>,
        reason: String,
    },
    #[error("{primitive}: invalid index {index}: {reason}")]
    InvalidIndex {
        primitive: String,
        index: String,
        reason: String,
    },
    #[error("Unknown primitive kind: {kind}")]
    UnknownKind { kind: String },
    #[error("{primitive}: no kernel '{function}' registered for rank {rank}")]
    UnknownFunction {
        primitive: String,
        function: String,
        rank: usize,
    },
    #[error("Stale handle: {handle} no longer refers to a live instance")]
    StaleHandle { handle: PrimitiveHandle },
    #[error("{primitive}: remote failure on {locality}: {reason}")]
    RemoteFailure {
        primitive: String,
        locality: LocalityId,
        reason: String,
    },
    #[error("{primitive}: sink '{destination}' unavailable: {reason}")]
    SinkUnavailable {
        primitive: String,
        destination: String,
        reason: String,
    },
    #[error("{primitive}: cannot serialize {variant} to '{destination}': {reason}")]
    SerializationFailed {
        primitive: String,
        destination: String,
        variant: String,
        reason: String,
    },
}

impl PrimitiveError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PrimitiveError::ArityMismatch { .. } => ErrorCode::ArityMismatch,
            PrimitiveError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            PrimitiveError::ShapeMismatch { .. } => ErrorCode::ShapeMismatch,
            PrimitiveError::InvalidIndex { .. } => ErrorCode::InvalidIndex,
            PrimitiveError::UnknownKind { .. } => ErrorCode::UnknownKind,
            PrimitiveError::UnknownFunction { .. } => ErrorCode::UnknownFunction,
            PrimitiveError::StaleHandle { .. } => ErrorCode::StaleHandle,
            PrimitiveError::RemoteFailure { .. } => ErrorCode::RemoteFailure,
            PrimitiveError::SinkUnavailable { .. } => ErrorCode::SinkUnavailable,
            PrimitiveError::SerializationFailed { .. } => ErrorCode::SerializationFailed,
        }
    }

    /// Diagnostic name of the primitive that raised the error, when known.
    pub fn primitive(&self) -> Option<&str> {
        match self {
            PrimitiveError::ArityMismatch { primitive, .. }
            | PrimitiveError::TypeMismatch { primitive, .. }
            | PrimitiveError::ShapeMismatch { primitive, .. }
            | PrimitiveError::InvalidIndex { primitive, .. }
            | PrimitiveError::UnknownFunction { primitive, .. }
            | PrimitiveError::RemoteFailure { primitive, .. }
            | PrimitiveError::SinkUnavailable { primitive, .. }
            | PrimitiveError::SerializationFailed { primitive, .. } => Some(primitive),
            PrimitiveError::UnknownKind { .. } | PrimitiveError::StaleHandle { .. } => None,
        }
    }

    pub fn error_context(&self) -> ErrorContext {
        let code = self.code();
        let ctx = match self {
            PrimitiveError::RemoteFailure { locality, .. } => {
                ErrorContext::retryable(code, self.to_string())
                    .with_metadata(json!({ "locality": locality.0 }))
            }
            PrimitiveError::SinkUnavailable { destination, .. } => {
                ErrorContext::retryable(code, self.to_string())
                    .with_metadata(json!({ "destination": destination }))
            }
            PrimitiveError::ShapeMismatch { shape, .. } => {
                ErrorContext::non_retryable(code, self.to_string())
                    .with_metadata(json!({ "shape": shape }))
            }
            PrimitiveError::UnknownFunction { function, rank, .. } => {
                ErrorContext::non_retryable(code, self.to_string())
                    .with_metadata(json!({ "function": function, "rank": rank }))
            }
            PrimitiveError::StaleHandle { handle } => {
                ErrorContext::non_retryable(code, self.to_string())
                    .with_severity(ErrorSeverity::Fatal)
                    .with_metadata(json!({
                        "locality": handle.locality.0,
                        "instance": handle.instance.0,
                    }))
            }
            PrimitiveError::SerializationFailed { destination, variant, .. } => {
                ErrorContext::non_retryable(code, self.to_string())
                    .with_severity(ErrorSeverity::Warning)
                    .with_metadata(json!({ "destination": destination, "variant": variant }))
            }
            _ => ErrorContext::non_retryable(code, self.to_string()),
        };
        match self.primitive() {
            Some(primitive) => ctx.with_primitive(primitive),
            None => ctx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::handle::InstanceId;
    use crate::error::ErrorRetryability;

    #[test]
    fn test_remote_failure_is_retryable() {
        let err = PrimitiveError::RemoteFailure {
            primitive: "vsplit".into(),
            locality: LocalityId(2),
            reason: "mailbox closed".into(),
        };
        let ctx = err.error_context();
        assert_eq!(ctx.code, ErrorCode::RemoteFailure);
        assert_eq!(ctx.retryability, ErrorRetryability::Retryable);
        assert_eq!(ctx.primitive.as_deref(), Some("vsplit"));
    }

    #[test]
    fn test_stale_handle_context_carries_ids() {
        let handle = PrimitiveHandle::new(LocalityId(1), InstanceId(7));
        let ctx = PrimitiveError::StaleHandle { handle }.error_context();
        assert_eq!(ctx.retryability, ErrorRetryability::NonRetryable);
        assert_eq!(ctx.severity, ErrorSeverity::Fatal);
        assert_eq!(ctx.primitive, None);
        assert_eq!(ctx.metadata, Some(json!({ "locality": 1, "instance": 7 })));
    }

    #[test]
    fn test_severity_by_kind() {
        let refused = PrimitiveError::SerializationFailed {
            primitive: "dump".into(),
            destination: "out.json".into(),
            variant: "nil".into(),
            reason: "nil has no external representation".into(),
        };
        let ctx = refused.error_context();
        assert_eq!(ctx.severity, ErrorSeverity::Warning);
        assert_eq!(ctx.metadata, Some(json!({ "destination": "out.json", "variant": "nil" })));

        let arity = PrimitiveError::ArityMismatch {
            primitive: "sin".into(),
            expected: "1".into(),
            actual: 0,
        };
        assert_eq!(arity.error_context().severity, ErrorSeverity::Error);
    }

    #[test]
    fn test_unknown_function_message() {
        let err = PrimitiveError::UnknownFunction {
            primitive: "gen".into(),
            function: "not_a_real_fn".into(),
            rank: 2,
        };
        assert_eq!(
            err.to_string(),
            "gen: no kernel 'not_a_real_fn' registered for rank 2"
        );
    }
}
