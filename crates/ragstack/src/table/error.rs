//! Error types for table maintenance operations.

use thiserror::Error;

/// Result type alias for table module.
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors that can occur during table maintenance operations.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("Could not resolve the query table from stack '{stack_name}'")]
    TableUnresolved { stack_name: String },

    #[error("{count} keys were still unprocessed after retrying")]
    UnprocessedKeys { count: usize },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Stack(#[from] crate::stack::StackError),
}
