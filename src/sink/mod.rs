//! External sinks values are persisted to.
//!
//! A sink maps destination names to stored values. Values are stored as JSON;
//! `Nil` and non-finite numbers have no representation and are refused.

mod file_sink;
mod memory_sink;

pub use file_sink::FileSink;
pub use memory_sink::MemorySink;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::value::Value;
use crate::error::PrimitiveError;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("destination '{destination}' unavailable: {reason}")]
    Unavailable { destination: String, reason: String },
    #[error("cannot serialize {variant} for '{destination}': {reason}")]
    Serialization {
        destination: String,
        variant: String,
        reason: String,
    },
}

impl SinkError {
    /// Attribute the failure to the primitive that hit it.
    pub fn into_primitive_error(self, primitive: &str) -> PrimitiveError {
        match self {
            SinkError::Unavailable {
                destination,
                reason,
            } => PrimitiveError::SinkUnavailable {
                primitive: primitive.to_string(),
                destination,
                reason,
            },
            SinkError::Serialization {
                destination,
                variant,
                reason,
            } => PrimitiveError::SerializationFailed {
                primitive: primitive.to_string(),
                destination,
                variant,
                reason,
            },
        }
    }
}

/// I/O collaborator consumed by `file_write` and `file_read`.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Store `value` at `destination`, replacing any previous content.
    async fn write(&self, destination: &str, value: &Value) -> Result<(), SinkError>;

    async fn read(&self, destination: &str) -> Result<Value, SinkError>;
}

/// Serialize `value`, refusing variants with no external representation.
pub fn encode(destination: &str, value: &Value) -> Result<Vec<u8>, SinkError> {
    if let Some(reason) = unrepresentable(value) {
        return Err(SinkError::Serialization {
            destination: destination.to_string(),
            variant: value.variant_name().to_string(),
            reason,
        });
    }
    serde_json::to_vec(value).map_err(|e| SinkError::Serialization {
        destination: destination.to_string(),
        variant: value.variant_name().to_string(),
        reason: e.to_string(),
    })
}

pub fn decode(destination: &str, bytes: &[u8]) -> Result<Value, SinkError> {
    serde_json::from_slice(bytes).map_err(|e| SinkError::Serialization {
        destination: destination.to_string(),
        variant: "unknown".to_string(),
        reason: e.to_string(),
    })
}

fn non_finite(xs: &[f64]) -> bool {
    xs.iter().any(|x| !x.is_finite())
}

fn unrepresentable(value: &Value) -> Option<String> {
    match value {
        Value::Nil => Some("nil has no external representation".to_string()),
        Value::Scalar(x) if !x.is_finite() => Some("non-finite number".to_string()),
        Value::Vector(v) if non_finite(v) => Some("non-finite number".to_string()),
        Value::Matrix(m) if non_finite(m.as_slice()) => Some("non-finite number".to_string()),
        Value::Range(items) => items.iter().find_map(unrepresentable),
        _ => None,
    }
}
