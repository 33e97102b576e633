//! Error types for the interceptor.

use thiserror::Error;

/// Result type alias for interception operations.
pub type Result<T> = std::result::Result<T, InterceptError>;

/// Errors raised while publishing an instrumentation plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterceptError {
    /// A plan was already published to this capability.
    #[error("interception is already active; a plan can only be published once")]
    AlreadyGuarding,
}
