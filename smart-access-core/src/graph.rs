//! Resource dependency graph and deployment ordering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::id::LogicalId;

/// Kind of a node in the resource graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
pub enum ResourceKind {
    Network,
    FirewallRuleSet,
    Secret,
    Database,
    Api,
    ApiResource,
    Route,
    Function,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::FirewallRuleSet => "firewall-rule-set",
            Self::Secret => "secret",
            Self::Database => "database",
            Self::Api => "api",
            Self::ApiResource => "api-resource",
            Self::Route => "route",
            Self::Function => "function",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct GraphNode {
    pub id: LogicalId,
    pub kind: ResourceKind,
}

/// Directed graph where an edge `a -> b` means `a` references `b`.
///
/// Nodes keep insertion order; it breaks ties in [`ResourceGraph::deploy_order`].
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: Vec<GraphNode>,
    index: BTreeMap<LogicalId, usize>,
    dependencies: BTreeMap<LogicalId, BTreeSet<LogicalId>>,
}

impl ResourceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource.
    ///
    /// # Errors
    /// Returns [`CoreError::DuplicateLogicalId`] if the id is already present.
    pub fn add_node(&mut self, id: LogicalId, kind: ResourceKind) -> Result<(), CoreError> {
        if self.index.contains_key(&id) {
            return Err(CoreError::DuplicateLogicalId(id.to_string()));
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(GraphNode { id, kind });
        Ok(())
    }

    /// Records that `from` references `to`. Unknown ids are reported by
    /// [`ResourceGraph::deploy_order`].
    pub fn add_dependency(&mut self, from: &LogicalId, to: &LogicalId) {
        self.dependencies
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
    }

    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &LogicalId) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Direct dependencies of `id`, sorted by logical id.
    pub fn dependencies_of(&self, id: &LogicalId) -> impl Iterator<Item = &LogicalId> {
        self.dependencies.get(id).into_iter().flatten()
    }

    /// Checks that every reference resolves to a node of the graph.
    ///
    /// # Errors
    /// Returns [`CoreError::DanglingReference`] for the first unresolved edge.
    pub fn check_references(&self) -> Result<(), CoreError> {
        for (from, targets) in &self.dependencies {
            if !self.index.contains_key(from) {
                return Err(CoreError::DanglingReference {
                    from: from.to_string(),
                    to: targets.iter().next().map(ToString::to_string).unwrap_or_default(),
                });
            }
            if let Some(missing) = targets.iter().find(|t| !self.index.contains_key(*t)) {
                return Err(CoreError::DanglingReference {
                    from: from.to_string(),
                    to: missing.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Orders nodes so every resource follows the resources it references.
    ///
    /// Among ready nodes the earliest inserted goes first, so the order is
    /// deterministic for a given construction sequence.
    ///
    /// # Errors
    /// Returns [`CoreError::DanglingReference`] if an edge points at an unknown
    /// node and [`CoreError::CyclicDependency`] if no valid order exists.
    pub fn deploy_order(&self) -> Result<Vec<&GraphNode>, CoreError> {
        self.check_references()?;

        let mut placed: BTreeSet<&LogicalId> = BTreeSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        while order.len() < self.nodes.len() {
            let ready = self.nodes.iter().find(|node| {
                !placed.contains(&node.id)
                    && self.dependencies_of(&node.id).all(|dep| placed.contains(dep))
            });
            match ready {
                Some(node) => {
                    placed.insert(&node.id);
                    order.push(node);
                }
                None => {
                    let members = self
                        .nodes
                        .iter()
                        .filter(|n| !placed.contains(&n.id))
                        .map(|n| n.id.to_string())
                        .collect();
                    return Err(CoreError::CyclicDependency { members });
                }
            }
        }
        Ok(order)
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

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> ResourceGraph {
        let mut g = ResourceGraph::new();
        for n in nodes {
            if let Err(e) = g.add_node(id(n), ResourceKind::Function) {
                panic!("unexpected error: {e}");
            }
        }
        for (from, to) in edges {
            g.add_dependency(&id(from), &id(to));
        }
        g
    }

    fn names(order: &[&GraphNode]) -> Vec<String> {
        order.iter().map(|n| n.id.to_string()).collect()
    }

    #[test]
    fn dependencies_come_first() {
        let g = graph(&["Route", "Function", "Api"], &[("Route", "Function"), ("Route", "Api")]);
        let order = match g.deploy_order() {
            Ok(o) => names(&o),
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(order, vec!["Function", "Api", "Route"]);
    }

    #[test]
    fn insertion_order_breaks_ties() {
        let g = graph(&["B", "A", "C"], &[]);
        let order = match g.deploy_order() {
            Ok(o) => names(&o),
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[test]
    fn cycle_is_reported() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "A")]);
        match g.deploy_order() {
            Err(CoreError::CyclicDependency { members }) => {
                assert_eq!(members, vec!["A".to_owned(), "B".to_owned()]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn dangling_reference_is_reported() {
        let g = graph(&["Database"], &[("Database", "Secret")]);
        assert!(matches!(
            g.deploy_order(),
            Err(CoreError::DanglingReference { from, to }) if from == "Database" && to == "Secret"
        ));
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut g = graph(&["A"], &[]);
        assert!(matches!(
            g.add_node(id("A"), ResourceKind::Secret),
            Err(CoreError::DuplicateLogicalId(_))
        ));
    }
}
