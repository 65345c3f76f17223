//! Entry point for the `smart-access-gateway` HTTP server.

use smart_access_core::assemble;
use smart_access_gateway::{router_for_stack, GatewayConfig};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env();

    let app = match assemble(&config.stack_config())
        .map_err(smart_access_gateway::GatewayError::from)
        .and_then(|stack| router_for_stack(&stack))
    {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "failed to build router");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(
        addr = %config.listen_addr,
        environment = %config.environment,
        "smart-access-gateway listening"
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
