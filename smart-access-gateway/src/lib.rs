//! Local HTTP gateway for the smart-access API.
//!
//! Serves the stack's routes on an axum router, dispatching each request to
//! the same handlers the deployed functions run.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod registry;
pub mod routes;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use registry::FunctionRegistry;
pub use routes::{create_router, router_for_stack};
