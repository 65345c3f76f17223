//! Managed relational database instance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::LogicalId;

/// Engine version as `major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct EngineVersion {
    pub major: u16,
    pub minor: u16,
}

impl EngineVersion {
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Database engine and its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Engine {
    Postgres(EngineVersion),
}

impl Engine {
    /// Provider engine name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
        }
    }

    #[must_use]
    pub const fn version(self) -> EngineVersion {
        match self {
            Self::Postgres(v) => v,
        }
    }

    /// Port the engine listens on unless overridden.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Postgres(_) => 5432,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum InstanceClass {
    T3,
    T4g,
    M6g,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum InstanceSize {
    Micro,
    Small,
    Medium,
    Large,
}

/// Instance class and size, rendered like `db.t4g.micro`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub struct InstanceType {
    pub class: InstanceClass,
    pub size: InstanceSize,
}

impl InstanceType {
    #[must_use]
    pub const fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self { class, size }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            InstanceClass::T3 => "t3",
            InstanceClass::T4g => "t4g",
            InstanceClass::M6g => "m6g",
        };
        let size = match self.size {
            InstanceSize::Micro => "micro",
            InstanceSize::Small => "small",
            InstanceSize::Medium => "medium",
            InstanceSize::Large => "large",
        };
        write!(f, "db.{class}.{size}")
    }
}

/// What happens to a resource when the stack is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RemovalPolicy {
    Destroy,
    Retain,
    Snapshot,
}

impl RemovalPolicy {
    /// Provider deletion policy name.
    #[must_use]
    pub const fn deletion_policy(self) -> &'static str {
        match self {
            Self::Destroy => "Delete",
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
        }
    }
}

/// The stack's single managed database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Database {
    pub id: LogicalId,
    pub engine: Engine,
    pub instance_type: InstanceType,
    pub port: u16,
    pub database_name: String,
    pub allocated_storage_gib: u32,
    pub backup_retention_days: u8,
    pub delete_automated_backups: bool,
    pub removal_policy: RemovalPolicy,
    pub network: LogicalId,
    pub firewall_rule_sets: Vec<LogicalId>,
    /// Secret holding the master username and password.
    pub credentials: LogicalId,
}

impl Database {
    /// Checks the field-level constraints the provider enforces.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), CoreError> {
        let resource = self.id.as_str();
        let name_ok = self
            .database_name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && self
                .database_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && self.database_name.len() <= 63;
        if !name_ok {
            return Err(CoreError::validation(
                resource,
                "database_name",
                "must start with a letter and contain at most 63 letters, digits, or underscores",
            ));
        }
        if self.port == 0 {
            return Err(CoreError::validation(resource, "port", "must be non-zero"));
        }
        if self.backup_retention_days > 35 {
            return Err(CoreError::validation(
                resource,
                "backup_retention_days",
                format!("must be at most 35, got {}", self.backup_retention_days),
            ));
        }
        if self.allocated_storage_gib < 20 {
            return Err(CoreError::validation(
                resource,
                "allocated_storage_gib",
                "must be at least 20",
            ));
        }
        if self.firewall_rule_sets.is_empty() {
            return Err(CoreError::validation(
                resource,
                "firewall_rule_sets",
                "at least one rule set is required",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LogicalId {
        match LogicalId::new(s) {
            Ok(id) => id,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    fn database() -> Database {
        Database {
            id: id("DBInstance"),
            engine: Engine::Postgres(EngineVersion::new(15, 4)),
            instance_type: InstanceType::of(InstanceClass::T4g, InstanceSize::Micro),
            port: 5432,
            database_name: "smart_access_db".to_owned(),
            allocated_storage_gib: 100,
            backup_retention_days: 0,
            delete_automated_backups: true,
            removal_policy: RemovalPolicy::Destroy,
            network: id("MyVPC"),
            firewall_rule_sets: vec![id("MySecurityGroup")],
            credentials: id("dbmasterusersecret"),
        }
    }

    #[test]
    fn renders_engine_and_instance_type() {
        let db = database();
        assert_eq!(db.engine.name(), "postgres");
        assert_eq!(db.engine.version().to_string(), "15.4");
        assert_eq!(db.instance_type.to_string(), "db.t4g.micro");
        assert_eq!(db.removal_policy.deletion_policy(), "Delete");
    }

    #[test]
    fn valid_database_passes() {
        assert!(database().validate().is_ok());
    }

    #[test]
    fn bad_database_name_is_rejected() {
        let mut db = database();
        db.database_name = "smart-access".to_owned();
        assert!(db.validate().is_err());
        db.database_name = "1db".to_owned();
        assert!(db.validate().is_err());
    }

    #[test]
    fn missing_firewall_is_rejected() {
        let mut db = database();
        db.firewall_rule_sets.clear();
        assert!(matches!(db.validate(), Err(CoreError::Validation { field, .. }) if field == "firewall_rule_sets"));
    }
}
