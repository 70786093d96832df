//! Error types for the execution core.
//!
//! - [`PrimitiveError`]: Failures raised while constructing or evaluating a primitive.
//! - [`EngineError`]: Engine-level failures (configuration, tree setup).
//! - [`ErrorContext`]: Structured error metadata (code, retryability, severity).

pub mod engine_error;
pub mod error_context;
pub mod primitive_error;

pub use engine_error::EngineError;
pub use error_context::{ErrorCode, ErrorContext, ErrorRetryability, ErrorSeverity};
pub use primitive_error::PrimitiveError;

/// Convenience alias for engine-level results.
pub type EngineResult<T> = Result<T, EngineError>;
/// Convenience alias for primitive-level results.
pub type PrimitiveResult<T> = Result<T, PrimitiveError>;
