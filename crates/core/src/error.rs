use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while synthesizing a template.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to serialize properties for {resource_type}: {source}")]
    Properties {
        resource_type: &'static str,
        source: serde_json::Error,
    },
    #[error("Failed to render template JSON: {0}")]
    Render(#[from] serde_json::Error),
    #[error("Duplicate logical id '{0}' in template")]
    DuplicateLogicalId(String),
}
