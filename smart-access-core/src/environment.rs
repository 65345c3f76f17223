//! Deployment environment selection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the process variable carrying the environment indicator.
///
/// Only binaries read it; assembly takes a [`DeployEnvironment`] value.
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// The indicator value that selects [`DeployEnvironment::Production`].
pub const PRODUCTION_INDICATOR: &str = "production";

/// Which public name the API is deployed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DeployEnvironment {
    /// Selected only by the exact indicator `production`.
    Production,
    /// Selected by any other indicator, including an absent one.
    #[default]
    Staging,
}

impl DeployEnvironment {
    /// Maps an environment indicator to an environment.
    ///
    /// The comparison is exact and case-sensitive: `"Production"` selects staging.
    #[must_use]
    pub fn from_indicator(indicator: Option<&str>) -> Self {
        match indicator {
            Some(PRODUCTION_INDICATOR) => Self::Production,
            _ => Self::Staging,
        }
    }

    /// The API name deployed in this environment.
    #[must_use]
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::Production => "prod-smart-access-api",
            Self::Staging => "stag-smart-access-api",
        }
    }

    /// Returns `true` for [`DeployEnvironment::Production`].
    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for DeployEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Staging => f.write_str("staging"),
        }
    }
}
