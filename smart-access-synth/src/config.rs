//! Synthesis settings read from the process environment.

use std::path::{Path, PathBuf};

use smart_access_core::{
    DeployEnvironment, Region, StackConfig, DEFAULT_STACK_NAME, ENVIRONMENT_VAR,
};

use crate::error::SynthError;

pub const REGION_VAR: &str = "SMART_ACCESS_REGION";
pub const STACK_NAME_VAR: &str = "SMART_ACCESS_STACK_NAME";
pub const OUT_DIR_VAR: &str = "SMART_ACCESS_OUT_DIR";

pub const DEFAULT_OUT_DIR: &str = "cdk.out";

/// Everything the synth binary needs to know about one run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct SynthConfig {
    pub environment: DeployEnvironment,
    pub region: Region,
    pub stack_name: String,
    pub out_dir: PathBuf,
}

impl SynthConfig {
    /// Reads the configuration from environment variables.
    ///
    /// - `ENVIRONMENT`: `production` selects production, anything else staging
    /// - `SMART_ACCESS_REGION`: defaults to `us-east-1`
    /// - `SMART_ACCESS_STACK_NAME`: defaults to `SmartAccessStack`
    /// - `SMART_ACCESS_OUT_DIR`: defaults to `cdk.out`
    ///
    /// # Errors
    /// Returns [`SynthError::Config`] if a variable is set but blank.
    pub fn from_env() -> Result<Self, SynthError> {
        let environment =
            DeployEnvironment::from_indicator(std::env::var(ENVIRONMENT_VAR).ok().as_deref());
        let region = Region::new(non_blank_or(REGION_VAR, Region::default().as_str())?);
        let stack_name = non_blank_or(STACK_NAME_VAR, DEFAULT_STACK_NAME)?;
        let out_dir = PathBuf::from(non_blank_or(OUT_DIR_VAR, DEFAULT_OUT_DIR)?);

        Ok(Self {
            environment,
            region,
            stack_name,
            out_dir,
        })
    }

    /// The stack configuration this run assembles.
    #[must_use]
    pub fn stack_config(&self) -> StackConfig {
        StackConfig::new(self.environment)
            .with_region(self.region.clone())
            .with_stack_name(self.stack_name.clone())
    }

    /// Path of the template file for this run.
    #[must_use]
    pub fn template_path(&self) -> PathBuf {
        template_path(&self.out_dir, &self.stack_name)
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            environment: DeployEnvironment::default(),
            region: Region::default(),
            stack_name: DEFAULT_STACK_NAME.to_owned(),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }
}

/// `<out_dir>/<stack_name>.template.json`
#[must_use]
pub fn template_path(out_dir: &Path, stack_name: &str) -> PathBuf {
    out_dir.join(format!("{stack_name}.template.json"))
}

fn non_blank_or(key: &str, default: &str) -> Result<String, SynthError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Err(SynthError::Config {
            key: key.to_owned(),
            reason: "must not be blank".to_owned(),
        }),
        Ok(value) => Ok(value),
        Err(_) => Ok(default.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 4] = [ENVIRONMENT_VAR, REGION_VAR, STACK_NAME_VAR, OUT_DIR_VAR];

    fn load() -> SynthConfig {
        match SynthConfig::from_env() {
            Ok(c) => c,
            Err(e) => panic!("config failed: {e}"),
        }
    }

    #[test]
    fn defaults_when_unset() {
        temp_env::with_vars(VARS.map(|k| (k, None::<&str>)), || {
            assert_eq!(load(), SynthConfig::default());
            assert_eq!(load().template_path(), PathBuf::from("cdk.out/SmartAccessStack.template.json"));
        });
    }

    #[test]
    fn reads_overrides() {
        temp_env::with_vars(
            [
                (ENVIRONMENT_VAR, Some("production")),
                (REGION_VAR, Some("eu-west-1")),
                (STACK_NAME_VAR, Some("Edge")),
                (OUT_DIR_VAR, Some("/tmp/out")),
            ],
            || {
                let config = load();
                assert_eq!(config.environment, DeployEnvironment::Production);
                assert_eq!(config.region.as_str(), "eu-west-1");
                assert_eq!(config.template_path(), PathBuf::from("/tmp/out/Edge.template.json"));

                let stack = config.stack_config();
                assert_eq!(stack.stack_name, "Edge");
                assert_eq!(stack.environment, DeployEnvironment::Production);
            },
        );
    }

    #[test]
    fn other_environment_values_mean_staging() {
        temp_env::with_var(ENVIRONMENT_VAR, Some("Production"), || {
            assert_eq!(load().environment, DeployEnvironment::Staging);
        });
    }

    #[test]
    fn blank_value_is_rejected() {
        temp_env::with_var(STACK_NAME_VAR, Some("  "), || {
            let err = match SynthConfig::from_env() {
                Ok(c) => panic!("expected an error, got {c:?}"),
                Err(e) => e,
            };
            assert!(err.to_string().contains(STACK_NAME_VAR));
        });
    }
}
