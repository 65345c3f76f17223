//! Turns the smart-access stack model into a CloudFormation template.
//!
//! [`synthesize`] expands a validated [`smart_access_core::Stack`] into
//! template resources; [`write_template`] persists the result where the
//! deployment tool picks it up.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod intrinsic;
pub mod synthesize;
pub mod template;

use std::path::{Path, PathBuf};

use smart_access_core::ContentHash;

pub use config::SynthConfig;
pub use error::SynthError;
pub use synthesize::synthesize;
pub use template::{Output, Template, TemplateResource};

/// Writes `template` to `<out_dir>/<stack_name>.template.json`, creating
/// `out_dir` if needed.
///
/// Returns the written path and the template's content hash.
///
/// # Errors
/// Returns [`SynthError::Io`] if the directory or file cannot be written and
/// [`SynthError::Serialize`] if the template cannot be rendered.
pub fn write_template(
    template: &Template,
    out_dir: &Path,
    stack_name: &str,
) -> Result<(PathBuf, ContentHash), SynthError> {
    let json = template.to_json()?;
    let hash = template.content_hash()?;

    std::fs::create_dir_all(out_dir).map_err(|source| SynthError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let path = config::template_path(out_dir, stack_name);
    std::fs::write(&path, json).map_err(|source| SynthError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::debug!(path = %path.display(), hash = %hash, "wrote template");
    Ok((path, hash))
}
