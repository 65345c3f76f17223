//! Assembly of the complete resource graph from a small configuration.
//!
//! [`assemble`] is a pure function of its [`StackConfig`]: it reads no
//! process state and produces the same [`Stack`] for the same input.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::api::{HttpMethod, ALLOW_ORIGIN_ENV, ResourceParent, ResourceTree, RestApi, Route};
use crate::cidr::Ipv4Cidr;
use crate::database::{
    Database, Engine, EngineVersion, InstanceClass, InstanceSize, InstanceType, RemovalPolicy,
};
use crate::environment::DeployEnvironment;
use crate::error::CoreError;
use crate::function::Function;
use crate::graph::{ResourceGraph, ResourceKind};
use crate::id::{LogicalId, Region};
use crate::network::{Network, DEFAULT_NETWORK_CIDR};
use crate::secret::{Secret, SecretGeneration};
use crate::security::{FirewallRuleSet, IngressRule, Peer, Protocol};

/// Stack name used when none is configured.
pub const DEFAULT_STACK_NAME: &str = "SmartAccessStack";

/// Binary name of the list-users function.
pub const USERS_LIST_ENTRY: &str = "users-list";
/// Binary name of the create-user function.
pub const USERS_CREATE_ENTRY: &str = "users-create";
/// Binary name of the get-user function.
pub const USERS_GET_ENTRY: &str = "users-get";

const ZONE_COUNT: u8 = 3;
const DATABASE_NAME: &str = "smart_access_db";
const SECRET_NAME: &str = "db-master-user-secret";
const MASTER_USERNAME: &str = "postgres";
const PASSWORD_LENGTH: u16 = 16;

/// Inputs that fully determine a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct StackConfig {
    pub stack_name: String,
    pub region: Region,
    pub environment: DeployEnvironment,
}

impl StackConfig {
    /// Default stack name and region for the given environment.
    #[must_use]
    pub fn new(environment: DeployEnvironment) -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_owned(),
            region: Region::default(),
            environment,
        }
    }

    #[must_use]
    pub fn with_stack_name(mut self, stack_name: impl Into<String>) -> Self {
        self.stack_name = stack_name.into();
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::new(DeployEnvironment::default())
    }
}

/// The complete set of resources deployed and destroyed as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Stack {
    pub config: StackConfig,
    pub network: Network,
    pub firewall: FirewallRuleSet,
    pub secret: Secret,
    pub database: Database,
    pub api: RestApi,
    pub resources: ResourceTree,
    pub routes: Vec<Route>,
    pub functions: Vec<Function>,
}

/// Builds the stack in dependency order and validates it.
///
/// Order: network, firewall rule set, secret, database, API, routes, functions.
///
/// # Errors
/// Returns the first [`CoreError`] raised while building a resource or by
/// [`Stack::validate`].
pub fn assemble(config: &StackConfig) -> Result<Stack, CoreError> {
    let network_cidr: Ipv4Cidr = DEFAULT_NETWORK_CIDR.parse()?;
    let network = Network::new(
        LogicalId::new("MyVPC")?,
        network_cidr,
        &config.region,
        ZONE_COUNT,
    )?;

    let database_engine = Engine::Postgres(EngineVersion::new(15, 4));
    let database_port = database_engine.default_port();

    let mut firewall = FirewallRuleSet::new(
        LogicalId::new("MySecurityGroup")?,
        network.id.clone(),
        "Allow postgresql access to the database",
        true,
    );
    firewall.add_ingress_rule(IngressRule::tcp(
        Peer::AnyIpv4,
        database_port,
        "allow postgresql traffic",
    ))?;

    let secret = Secret::new(
        LogicalId::from_path(&[SECRET_NAME])?,
        SECRET_NAME,
        "Database master user credentials",
        SecretGeneration::username_password(MASTER_USERNAME, PASSWORD_LENGTH, true),
    )?;

    let database = Database {
        id: LogicalId::new("DBInstance")?,
        engine: database_engine,
        instance_type: InstanceType::of(InstanceClass::T4g, InstanceSize::Micro),
        port: database_port,
        database_name: DATABASE_NAME.to_owned(),
        allocated_storage_gib: 100,
        backup_retention_days: 0,
        delete_automated_backups: true,
        removal_policy: RemovalPolicy::Destroy,
        network: network.id.clone(),
        firewall_rule_sets: vec![firewall.id.clone()],
        credentials: secret.id.clone(),
    };

    let api_name = config.environment.api_name();
    let api = RestApi::new(LogicalId::from_path(&[api_name])?, api_name);

    let list_users = LogicalId::new("ListUsersFunction")?;
    let create_user = LogicalId::new("CreateUserFunction")?;
    let get_user = LogicalId::new("GetUserFunction")?;

    let routes = vec![
        Route::new(HttpMethod::Get, "/users", list_users.clone())?,
        Route::new(HttpMethod::Post, "/users", create_user.clone())?,
        Route::new(HttpMethod::Get, "/users/{id}", get_user.clone())?,
    ];
    let resources = ResourceTree::from_routes(&api.id, &routes)?;

    // Proxy integrations pass responses through, so handlers add the CORS origin.
    let allow_origin = api.cors.allowed_origin_header();
    let functions = [
        (list_users, USERS_LIST_ENTRY),
        (create_user, USERS_CREATE_ENTRY),
        (get_user, USERS_GET_ENTRY),
    ]
    .into_iter()
    .map(|(id, entry)| {
        let mut function = Function::new(id, entry)?;
        function
            .environment
            .insert(ALLOW_ORIGIN_ENV.to_owned(), allow_origin.clone());
        Ok(function)
    })
    .collect::<Result<Vec<_>, CoreError>>()?;

    let stack = Stack {
        config: config.clone(),
        network,
        firewall,
        secret,
        database,
        api,
        resources,
        routes,
        functions,
    };
    stack.validate()?;

    tracing::debug!(
        stack = %stack.config.stack_name,
        environment = %stack.config.environment,
        api = %stack.api.name,
        routes = stack.routes.len(),
        "assembled stack"
    );

    Ok(stack)
}

impl Stack {
    /// Logical id of the method resource serving `route`, e.g.
    /// `stagsmartaccessapiusersidGET`.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidLogicalId`] if the derived id is invalid.
    pub fn route_id(&self, route: &Route) -> Result<LogicalId, CoreError> {
        let parent = self
            .resources
            .find(&route.path)
            .map_or(&self.api.id, |r| &r.id);
        parent.child(route.method.as_str())
    }

    /// The function with the given id.
    #[must_use]
    pub fn function(&self, id: &LogicalId) -> Option<&Function> {
        self.functions.iter().find(|f| &f.id == id)
    }

    /// The resource graph: one node per resource, one edge per reference.
    ///
    /// # Errors
    /// Returns [`CoreError::DuplicateLogicalId`] if two resources share an id.
    pub fn graph(&self) -> Result<ResourceGraph, CoreError> {
        let mut graph = ResourceGraph::new();

        graph.add_node(self.network.id.clone(), ResourceKind::Network)?;

        graph.add_node(self.firewall.id.clone(), ResourceKind::FirewallRuleSet)?;
        graph.add_dependency(&self.firewall.id, &self.firewall.network);

        graph.add_node(self.secret.id.clone(), ResourceKind::Secret)?;

        graph.add_node(self.database.id.clone(), ResourceKind::Database)?;
        graph.add_dependency(&self.database.id, &self.database.network);
        for rule_set in &self.database.firewall_rule_sets {
            graph.add_dependency(&self.database.id, rule_set);
        }
        graph.add_dependency(&self.database.id, &self.database.credentials);

        graph.add_node(self.api.id.clone(), ResourceKind::Api)?;
        for resource in &self.resources.resources {
            graph.add_node(resource.id.clone(), ResourceKind::ApiResource)?;
            let parent = match &resource.parent {
                ResourceParent::Root => &self.api.id,
                ResourceParent::Resource(id) => id,
            };
            graph.add_dependency(&resource.id, parent);
        }

        for route in &self.routes {
            let id = self.route_id(route)?;
            graph.add_node(id.clone(), ResourceKind::Route)?;
            let resource = self.resources.find(&route.path).map_or(&self.api.id, |r| &r.id);
            graph.add_dependency(&id, resource);
            graph.add_dependency(&id, &route.function);
        }

        for function in &self.functions {
            graph.add_node(function.id.clone(), ResourceKind::Function)?;
        }

        Ok(graph)
    }

    /// Checks every cross-resource invariant of the stack.
    ///
    /// - the graph has no duplicate ids, dangling references, or cycles
    /// - each `(path, method)` pair is routed once
    /// - each function is bound by exactly one route
    /// - the database port is open in one of its firewall rule sets
    ///
    /// # Errors
    /// Returns the first violated invariant as a [`CoreError`].
    pub fn validate(&self) -> Result<(), CoreError> {
        self.graph()?.deploy_order()?;
        self.database.validate()?;

        let mut seen = BTreeSet::new();
        for route in &self.routes {
            if !seen.insert((route.path_string(), route.method)) {
                return Err(CoreError::validation(
                    self.api.id.as_str(),
                    "routes",
                    format!("{} {} is routed twice", route.method, route.path_string()),
                ));
            }
        }

        let mut bindings: BTreeMap<&LogicalId, usize> =
            self.functions.iter().map(|f| (&f.id, 0)).collect();
        for route in &self.routes {
            if let Some(count) = bindings.get_mut(&route.function) {
                *count += 1;
            }
        }
        if let Some((function, count)) = bindings.iter().find(|(_, count)| **count != 1) {
            return Err(CoreError::validation(
                function.as_str(),
                "routes",
                format!("function must be bound by exactly one route, found {count}"),
            ));
        }

        let in_network = self.network.cidr.address();
        let port_open = self
            .database
            .firewall_rule_sets
            .iter()
            .filter_map(|id| (self.firewall.id == *id).then_some(&self.firewall))
            .any(|set| set.permits_ingress(Protocol::Tcp, self.database.port, in_network));
        if !port_open {
            return Err(CoreError::validation(
                self.database.id.as_str(),
                "port",
                format!("port {} is not open in any attached firewall rule set", self.database.port),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::graph::GraphNode;

    fn staging() -> Stack {
        match assemble(&StackConfig::new(DeployEnvironment::Staging)) {
            Ok(s) => s,
            Err(e) => panic!("assembly failed: {e}"),
        }
    }

    fn kinds(order: &[&GraphNode]) -> Vec<ResourceKind> {
        order.iter().map(|n| n.kind).collect()
    }

    #[test]
    fn environment_selects_api_name() {
        let prod = match assemble(&StackConfig::new(DeployEnvironment::Production)) {
            Ok(s) => s,
            Err(e) => panic!("assembly failed: {e}"),
        };
        assert_eq!(prod.api.name, "prod-smart-access-api");
        assert_eq!(prod.api.id.as_str(), "prodsmartaccessapi");
        assert_eq!(staging().api.name, "stag-smart-access-api");
    }

    #[test]
    fn stack_matches_the_configuration_model() {
        let stack = staging();
        assert_eq!(stack.network.availability_zones().len(), 3);
        assert_eq!(stack.secret.name, "db-master-user-secret");
        assert_eq!(stack.secret.username(), Some("postgres"));
        assert_eq!(stack.secret.generation.length, 16);
        assert!(stack.secret.generation.exclude_punctuation);
        assert_eq!(stack.database.instance_type.to_string(), "db.t4g.micro");
        assert_eq!(stack.database.engine.version().to_string(), "15.4");
        assert_eq!(stack.database.database_name, "smart_access_db");
        assert_eq!(stack.database.port, 5432);
        assert_eq!(stack.database.backup_retention_days, 0);
        assert_eq!(stack.database.removal_policy, RemovalPolicy::Destroy);
        assert!(stack.api.cors.is_permissive());
        assert!(stack
            .functions
            .iter()
            .all(|f| f.environment.get(ALLOW_ORIGIN_ENV).map(String::as_str) == Some("*")));
    }

    #[test]
    fn stack_keeps_chosen_names() {
        let stack = staging();
        assert_eq!(stack.config.stack_name, "SmartAccessStack");
        assert_eq!(stack.firewall.description, "Allow postgresql access to the database");
        assert_eq!(stack.firewall.ingress[0].description, "allow postgresql traffic");
    }

    #[test]
    fn firewall_permits_only_postgres() {
        let stack = staging();
        let anywhere = Ipv4Addr::new(203, 0, 113, 9);
        assert!(stack.firewall.permits_ingress(Protocol::Tcp, 5432, anywhere));
        for port in [22, 80, 443, 3306, 5431, 5433] {
            assert!(!stack.firewall.permits_ingress(Protocol::Tcp, port, anywhere), "port {port} must be closed");
        }
        assert!(stack.firewall.allow_all_outbound);
    }

    #[test]
    fn routes_bind_expected_functions() {
        let stack = staging();
        let table: Vec<(String, String, String)> = stack
            .routes
            .iter()
            .map(|r| {
                let entry = stack.function(&r.function).map(|f| f.entry.clone()).unwrap_or_default();
                (r.method.to_string(), r.path_string(), entry)
            })
            .collect();
        assert_eq!(
            table,
            vec![
                ("GET".to_owned(), "/users".to_owned(), "users-list".to_owned()),
                ("POST".to_owned(), "/users".to_owned(), "users-create".to_owned()),
                ("GET".to_owned(), "/users/{id}".to_owned(), "users-get".to_owned()),
            ]
        );
    }

    #[test]
    fn deploy_order_places_references_first() {
        let stack = staging();
        let graph = match stack.graph() {
            Ok(g) => g,
            Err(e) => panic!("graph failed: {e}"),
        };
        let order = match graph.deploy_order() {
            Ok(o) => o,
            Err(e) => panic!("ordering failed: {e}"),
        };
        let kinds = kinds(&order);
        assert_eq!(kinds[..4], [
            ResourceKind::Network,
            ResourceKind::FirewallRuleSet,
            ResourceKind::Secret,
            ResourceKind::Database,
        ]);
        for (position, node) in order.iter().enumerate() {
            for dep in graph.dependencies_of(&node.id) {
                let dep_position = order.iter().position(|n| &n.id == dep);
                assert!(
                    dep_position.is_some_and(|p| p < position),
                    "{} must follow {dep}",
                    node.id
                );
            }
        }
    }

    #[test]
    fn assembly_is_deterministic() {
        let config = StackConfig::new(DeployEnvironment::Production);
        let a = assemble(&config);
        let b = assemble(&config);
        assert_eq!(a, b);
    }

    #[test]
    fn dangling_credentials_fail_validation() {
        let mut stack = staging();
        stack.database.credentials = match LogicalId::new("MissingSecret") {
            Ok(id) => id,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert!(matches!(
            stack.validate(),
            Err(CoreError::DanglingReference { to, .. }) if to == "MissingSecret"
        ));
    }

    #[test]
    fn duplicate_route_fails_validation() {
        let mut stack = staging();
        let mut duplicate = stack.routes[0].clone();
        duplicate.function = stack.functions[1].id.clone();
        stack.routes.push(duplicate);
        assert!(stack.validate().is_err());
    }

    #[test]
    fn unbound_function_fails_validation() {
        let mut stack = staging();
        stack.routes.pop();
        assert!(matches!(
            stack.validate(),
            Err(CoreError::Validation { resource, .. }) if resource == "GetUserFunction"
        ));
    }

    #[test]
    fn closed_database_port_fails_validation() {
        let mut stack = staging();
        stack.database.port = 5433;
        assert!(matches!(
            stack.validate(),
            Err(CoreError::Validation { field, .. }) if field == "port"
        ));
    }
}
