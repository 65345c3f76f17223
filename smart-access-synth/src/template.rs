//! CloudFormation template document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use smart_access_core::ContentHash;

use crate::error::SynthError;

pub const FORMAT_VERSION: &str = "2010-09-09";

/// A complete deployment template.
///
/// Maps are ordered, so serializing the same template always yields the
/// same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[non_exhaustive]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    pub description: String,
    pub resources: BTreeMap<String, TemplateResource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_owned(),
            description: description.into(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Adds a resource under `logical_id`.
    ///
    /// # Errors
    /// Returns [`SynthError::DuplicateResource`] if the key is taken.
    pub fn insert(
        &mut self,
        logical_id: impl Into<String>,
        resource: TemplateResource,
    ) -> Result<(), SynthError> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) {
            return Err(SynthError::DuplicateResource(logical_id));
        }
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    /// Logical ids of every resource of the given type, sorted.
    pub fn resources_of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a str> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id.as_str())
    }

    /// Pretty-printed JSON with sorted keys and a trailing newline.
    ///
    /// # Errors
    /// Returns [`SynthError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SynthError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// SHA-256 of [`Template::to_json`].
    ///
    /// Equal for templates synthesized from identical inputs.
    ///
    /// # Errors
    /// Returns [`SynthError::Serialize`] if serialization fails.
    pub fn content_hash(&self) -> Result<ContentHash, SynthError> {
        let json = self.to_json()?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(ContentHash::new(hasher.finalize().into()))
    }
}

/// One resource entry of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[non_exhaustive]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<String>,
}

impl TemplateResource {
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    /// Adds explicit dependencies; kept sorted and unique.
    #[must_use]
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self.depends_on.sort();
        self.depends_on.dedup();
        self
    }

    /// Sets both the deletion and update-replace policy.
    #[must_use]
    pub fn removal_policy(mut self, policy: &str) -> Self {
        self.deletion_policy = Some(policy.to_owned());
        self.update_replace_policy = Some(policy.to_owned());
        self
    }
}

/// A stack output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[non_exhaustive]
pub struct Output {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Output {
    pub fn new(value: Value, description: impl Into<String>) -> Self {
        Self {
            value,
            description: Some(description.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_provider_key_casing() {
        let mut template = Template::new("test");
        let resource = TemplateResource::new("AWS::EC2::VPC", json!({ "CidrBlock": "10.0.0.0/16" }))
            .depends_on(["B", "A", "B"])
            .removal_policy("Delete");
        if let Err(e) = template.insert("MyVPC", resource) {
            panic!("insert failed: {e}");
        }
        let value = match serde_json::to_value(&template) {
            Ok(v) => v,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(value["Resources"]["MyVPC"]["Type"], "AWS::EC2::VPC");
        assert_eq!(value["Resources"]["MyVPC"]["DependsOn"], json!(["A", "B"]));
        assert_eq!(value["Resources"]["MyVPC"]["DeletionPolicy"], "Delete");
        assert!(value.get("Outputs").is_none(), "empty outputs are omitted");
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut template = Template::new("test");
        let resource = TemplateResource::new("AWS::EC2::VPC", json!({}));
        assert!(template.insert("MyVPC", resource.clone()).is_ok());
        assert!(matches!(
            template.insert("MyVPC", resource),
            Err(SynthError::DuplicateResource(id)) if id == "MyVPC"
        ));
    }

    #[test]
    fn content_hash_tracks_content() {
        let a = Template::new("one");
        let b = Template::new("one");
        let c = Template::new("two");
        let hash = |t: &Template| match t.content_hash() {
            Ok(h) => h,
            Err(e) => panic!("hash failed: {e}"),
        };
        assert_eq!(hash(&a), hash(&b));
        assert_ne!(hash(&a), hash(&c));
    }
}
