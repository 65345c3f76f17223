//! Lambda entry point serving `GET /users`.

use smart_access_core::ALLOW_ORIGIN_ENV;
use smart_access_functions::{lambda, FunctionKind};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    // CloudWatch stamps each line already.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let allow_origin = std::env::var(ALLOW_ORIGIN_ENV)
        .unwrap_or_else(|_| lambda::DEFAULT_ALLOW_ORIGIN.to_owned());
    lambda::run(FunctionKind::List, allow_origin).await
}
