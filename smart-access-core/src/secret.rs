//! Generated credential material stored by the provider.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::LogicalId;

const MAX_GENERATED_LENGTH: u16 = 4096;

/// How the provider generates the secret value on first creation.
///
/// The generated string is merged into `template` under `generate_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SecretGeneration {
    /// Fixed fields of the stored JSON object.
    pub template: BTreeMap<String, String>,
    /// Field that receives the generated value.
    pub generate_key: String,
    pub length: u16,
    pub exclude_punctuation: bool,
}

impl SecretGeneration {
    /// Credentials for a fixed `username` with a generated `password`.
    #[must_use]
    pub fn username_password(username: &str, length: u16, exclude_punctuation: bool) -> Self {
        Self {
            template: BTreeMap::from([("username".to_owned(), username.to_owned())]),
            generate_key: "password".to_owned(),
            length,
            exclude_punctuation,
        }
    }
}

/// A named secret generated once at creation and never regenerated implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Secret {
    pub id: LogicalId,
    pub name: String,
    pub description: String,
    pub generation: SecretGeneration,
}

impl Secret {
    /// Creates a secret after validating its generation policy.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] if the name is empty, the length is
    /// outside `1..=4096`, or the generated key collides with a template field.
    pub fn new(
        id: LogicalId,
        name: impl Into<String>,
        description: impl Into<String>,
        generation: SecretGeneration,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::validation(id.as_str(), "name", "must not be empty"));
        }
        if generation.length == 0 || generation.length > MAX_GENERATED_LENGTH {
            return Err(CoreError::validation(
                id.as_str(),
                "generation.length",
                format!("must be in 1..={MAX_GENERATED_LENGTH}, got {}", generation.length),
            ));
        }
        if generation.template.contains_key(&generation.generate_key) {
            return Err(CoreError::validation(
                id.as_str(),
                "generation.generate_key",
                format!("'{}' is already a template field", generation.generate_key),
            ));
        }
        Ok(Self {
            id,
            name,
            description: description.into(),
            generation,
        })
    }

    /// The fixed username stored in the template, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.generation.template.get("username").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> LogicalId {
        match LogicalId::new("dbmasterusersecret") {
            Ok(id) => id,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn username_password_policy_has_fixed_fields() {
        let generation = SecretGeneration::username_password("postgres", 16, true);
        assert_eq!(generation.template.get("username").map(String::as_str), Some("postgres"));
        assert_eq!(generation.generate_key, "password");
        assert!(generation.exclude_punctuation);
    }

    #[test]
    fn zero_length_is_rejected() {
        let generation = SecretGeneration::username_password("postgres", 0, true);
        let result = Secret::new(id(), "db-master-user-secret", "creds", generation);
        assert!(matches!(result, Err(CoreError::Validation { .. })));
    }

    #[test]
    fn generated_key_must_not_shadow_template_field() {
        let mut generation = SecretGeneration::username_password("postgres", 16, true);
        generation.generate_key = "username".to_owned();
        let result = Secret::new(id(), "db-master-user-secret", "creds", generation);
        assert!(matches!(result, Err(CoreError::Validation { .. })));
    }

    #[test]
    fn username_reads_template() {
        let generation = SecretGeneration::username_password("postgres", 16, true);
        let secret = match Secret::new(id(), "db-master-user-secret", "creds", generation) {
            Ok(s) => s,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(secret.username(), Some("postgres"));
    }
}
