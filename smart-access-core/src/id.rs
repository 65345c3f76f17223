use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum length of a logical id accepted by the provider.
const MAX_LOGICAL_ID_LEN: usize = 255;

/// Identifies a resource within a single stack.
///
/// Logical ids are ASCII alphanumeric, non-empty, and at most 255 characters,
/// so they can be used verbatim as template resource keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub struct LogicalId(String);

impl LogicalId {
    /// Creates a `LogicalId` from an already sanitized value.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidLogicalId`] if the value is empty, longer than
    /// 255 characters, or contains a non-alphanumeric character.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        let reason = if value.is_empty() {
            Some("must not be empty".to_owned())
        } else if value.len() > MAX_LOGICAL_ID_LEN {
            Some(format!("must be at most {MAX_LOGICAL_ID_LEN} characters"))
        } else if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some("must contain only ASCII letters and digits".to_owned())
        } else {
            None
        };
        match reason {
            Some(reason) => Err(CoreError::InvalidLogicalId { value, reason }),
            None => Ok(Self(value)),
        }
    }

    /// Builds a logical id from construct path segments, dropping every
    /// character that is not ASCII alphanumeric (`"db-master-user-secret"`
    /// becomes `"dbmasterusersecret"`).
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidLogicalId`] if nothing is left after sanitizing.
    pub fn from_path(segments: &[&str]) -> Result<Self, CoreError> {
        let joined: String = segments
            .iter()
            .flat_map(|s| s.chars())
            .filter(char::is_ascii_alphanumeric)
            .collect();
        if joined.is_empty() {
            return Err(CoreError::InvalidLogicalId {
                value: segments.join("/"),
                reason: "no alphanumeric characters in construct path".to_owned(),
            });
        }
        Self::new(joined)
    }

    /// Derives the id of a resource nested under this one.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidLogicalId`] if the combined id is invalid.
    pub fn child(&self, suffix: &str) -> Result<Self, CoreError> {
        Self::from_path(&[&self.0, suffix])
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LogicalId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}

/// A provider region name, e.g. `us-east-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Region(pub String);

impl Region {
    /// Creates a `Region` from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the first `count` availability zones of this region
    /// (`us-east-1a`, `us-east-1b`, ...).
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidNetwork`] if `count` is zero or exceeds 26.
    pub fn availability_zones(&self, count: u8) -> Result<Vec<String>, CoreError> {
        if count == 0 || count > 26 {
            return Err(CoreError::InvalidNetwork {
                reason: format!("zone count must be in 1..=26, got {count}"),
            });
        }
        Ok((b'a'..b'a' + count)
            .map(|suffix| format!("{}{}", self.0, char::from(suffix)))
            .collect())
    }

    /// Returns the region name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new("us-east-1")
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A SHA-256 content hash identifying a synthesized artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Creates a `ContentHash` from a raw 32-byte array.
    #[must_use]
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
