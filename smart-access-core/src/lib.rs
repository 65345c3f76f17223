//! Declarative resource model for the smart-access stack.
//!
//! Describes what to provision (network, firewall rule set, secret,
//! database, HTTP API, routes, functions) as plain typed records, and
//! assembles them into a validated [`Stack`]. Turning a stack into provider
//! instructions is the job of `smart-access-synth`.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod api;
pub mod cidr;
pub mod database;
pub mod environment;
pub mod error;
pub mod function;
pub mod graph;
pub mod id;
pub mod network;
pub mod secret;
pub mod security;
pub mod stack;

pub use api::{
    ApiResource, ALLOW_ORIGIN_ENV, Authorization, CorsPolicy, HttpMethod, PathSegment, ResourceParent,
    ResourceTree, RestApi, Route,
};
pub use cidr::{Ipv4Cidr, ANY_IPV4};
pub use database::{Database, Engine, EngineVersion, InstanceType, RemovalPolicy};
pub use environment::{DeployEnvironment, ENVIRONMENT_VAR};
pub use error::CoreError;
pub use function::{Architecture, Function, Runtime};
pub use graph::{GraphNode, ResourceGraph, ResourceKind};
pub use id::{ContentHash, LogicalId, Region};
pub use network::{Network, Subnet, SubnetKind};
pub use secret::{Secret, SecretGeneration};
pub use security::{FirewallRuleSet, IngressRule, Peer, PortRange, Protocol};
pub use stack::{
    assemble, Stack, StackConfig, DEFAULT_STACK_NAME, USERS_CREATE_ENTRY, USERS_GET_ENTRY,
    USERS_LIST_ENTRY,
};
