//! Engine-level error types.

use super::PrimitiveError;
use thiserror::Error;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Config parse error: {0}")]
    ConfigParse(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}
