//! Error types for stack operations.

use thiserror::Error;

/// Result type alias for the stack module.
pub type Result<T> = std::result::Result<T, StackError>;

/// Errors that can occur while planning or executing stack operations.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("Stack '{stack_name}' not found")]
    StackNotFound { stack_name: String },

    #[error("Stack '{stack_name}' has an operation in progress ({status})")]
    OperationInProgress { stack_name: String, status: String },

    #[error("--image-uri is required when creating the stack")]
    MissingImageUri,

    #[error("Stack operation failed with status {status}: {reason}")]
    OperationFailed { status: String, reason: String },

    #[error("Timeout waiting for stack '{stack_name}' to settle")]
    OperationTimeout { stack_name: String },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] ragstack_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
