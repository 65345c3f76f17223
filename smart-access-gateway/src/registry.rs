//! Maps stack functions to the handlers that serve them locally.

use std::collections::BTreeMap;

use smart_access_core::{LogicalId, Stack};
use smart_access_functions::FunctionKind;

use crate::error::GatewayError;

/// Handler lookup keyed by function logical id.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    entries: BTreeMap<LogicalId, FunctionKind>,
}

impl FunctionRegistry {
    /// Resolves every function of `stack` by its package entry.
    ///
    /// # Errors
    /// Returns [`GatewayError::UnknownFunction`] if an entry has no handler.
    pub fn from_stack(stack: &Stack) -> Result<Self, GatewayError> {
        let mut entries = BTreeMap::new();
        for function in &stack.functions {
            let kind = FunctionKind::from_entry(&function.entry).ok_or_else(|| {
                GatewayError::UnknownFunction {
                    function: function.id.clone(),
                    entry: function.entry.clone(),
                }
            })?;
            entries.insert(function.id.clone(), kind);
        }
        Ok(Self { entries })
    }

    /// The handler for function `id`.
    #[must_use]
    pub fn get(&self, id: &LogicalId) -> Option<FunctionKind> {
        self.entries.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
