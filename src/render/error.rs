//! Template engine error types

use thiserror::Error;

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template failed to parse or render
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Page data could not be turned into a template context
    #[error("Invalid template context: {0}")]
    InvalidContext(String),

    /// Embedded template is not valid UTF-8
    #[error("Template {0} is not valid UTF-8")]
    InvalidEncoding(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
