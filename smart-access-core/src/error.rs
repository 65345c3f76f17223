/// Errors produced by the `smart-access-core` crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A logical id was empty, too long, or contained non-alphanumeric characters.
    #[error("invalid logical id '{value}': {reason}")]
    InvalidLogicalId { value: String, reason: String },

    /// A CIDR block could not be parsed or allocated.
    #[error("invalid cidr '{value}': {reason}")]
    InvalidCidr { value: String, reason: String },

    /// The network layout cannot be built from the given parameters.
    #[error("invalid network: {reason}")]
    InvalidNetwork { reason: String },

    /// A resource field failed validation.
    #[error("validation failed for {resource}.{field}: {reason}")]
    Validation {
        resource: String,
        field: String,
        reason: String,
    },

    /// Two resources in the same stack share a logical id.
    #[error("duplicate logical id: {0}")]
    DuplicateLogicalId(String),

    /// A resource references an id that is not defined in the stack.
    #[error("resource '{from}' references undefined resource '{to}'")]
    DanglingReference { from: String, to: String },

    /// The resource graph contains a cycle through the listed resources.
    #[error("cyclic dependency between resources: {}", .members.join(", "))]
    CyclicDependency { members: Vec<String> },
}

impl CoreError {
    pub(crate) fn validation(
        resource: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            resource: resource.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}
