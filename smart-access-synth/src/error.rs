//! Error types for the synth crate.

use std::path::PathBuf;

use smart_access_core::CoreError;

/// Errors that can occur while synthesizing or writing a template.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SynthError {
    /// An environment variable holds an unusable value.
    #[error("invalid configuration {key}: {reason}")]
    Config { key: String, reason: String },

    /// The stack model failed assembly or validation.
    #[error("stack model error: {0}")]
    Core(#[from] CoreError),

    /// Two emitted template resources share a key.
    #[error("duplicate template resource: {0}")]
    DuplicateResource(String),

    /// A resource referenced during synthesis is missing from the stack.
    #[error("resource '{from}' needs '{missing}', which the stack does not define")]
    MissingResource { from: String, missing: String },

    /// Template JSON could not be produced.
    #[error("template serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The template could not be written to disk.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
