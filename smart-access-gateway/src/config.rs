//! Gateway settings read from the process environment.

use smart_access_core::{DeployEnvironment, StackConfig, ENVIRONMENT_VAR};

pub const LISTEN_ADDR_VAR: &str = "SMART_ACCESS_LISTEN_ADDR";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3456";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct GatewayConfig {
    pub listen_addr: String,
    pub environment: DeployEnvironment,
}

impl GatewayConfig {
    /// Reads `SMART_ACCESS_LISTEN_ADDR` (default `127.0.0.1:3456`) and
    /// `ENVIRONMENT`.
    #[must_use]
    pub fn from_env() -> Self {
        let listen_addr =
            std::env::var(LISTEN_ADDR_VAR).unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_owned());
        let environment =
            DeployEnvironment::from_indicator(std::env::var(ENVIRONMENT_VAR).ok().as_deref());
        Self {
            listen_addr,
            environment,
        }
    }

    #[must_use]
    pub fn stack_config(&self) -> StackConfig {
        StackConfig::new(self.environment)
    }
}
