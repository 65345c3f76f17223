//! Deployable request handler units.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::LogicalId;

/// Execution runtime of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Runtime {
    /// Custom runtime on Amazon Linux 2023; the package ships a `bootstrap` binary.
    ProvidedAl2023,
}

impl Runtime {
    #[must_use]
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::ProvidedAl2023 => "provided.al2023",
        }
    }

    /// Handler name the runtime invokes.
    #[must_use]
    pub const fn default_handler(self) -> &'static str {
        match self {
            Self::ProvidedAl2023 => "bootstrap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Architecture {
    Arm64,
    X86_64,
}

impl Architecture {
    #[must_use]
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
        }
    }
}

/// A stateless request handler bound to exactly one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Function {
    pub id: LogicalId,
    /// Name of the packaged binary, e.g. `users-get`.
    pub entry: String,
    pub handler: String,
    pub runtime: Runtime,
    pub architecture: Architecture,
    pub memory_mb: u16,
    pub timeout_secs: u16,
    pub environment: BTreeMap<String, String>,
}

impl Function {
    /// A function with provider defaults and no environment variables.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] if `entry` is empty.
    pub fn new(id: LogicalId, entry: impl Into<String>) -> Result<Self, CoreError> {
        let entry = entry.into();
        if entry.trim().is_empty() {
            return Err(CoreError::validation(id.as_str(), "entry", "must not be empty"));
        }
        let runtime = Runtime::ProvidedAl2023;
        Ok(Self {
            id,
            entry,
            handler: runtime.default_handler().to_owned(),
            runtime,
            architecture: Architecture::Arm64,
            memory_mb: 128,
            timeout_secs: 3,
            environment: BTreeMap::new(),
        })
    }
}
