//! Axum router serving the stack's API routes locally.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query,
    },
    http::{header::HeaderName, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, on, MethodFilter, MethodRouter},
    Json, Router,
};
use chrono::Utc;
use smart_access_core::{
    api::{AllowedMethods, AllowedOrigins},
    CorsPolicy, HttpMethod, Route, Stack,
};
use smart_access_functions::{invoke, ApiRequest, ApiResponse, FunctionKind};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{error::GatewayError, registry::FunctionRegistry};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the router serving every route of `stack`.
///
/// # Errors
/// Returns [`GatewayError::UnknownFunction`] if a function has no handler, or
/// any error from [`create_router`].
pub fn router_for_stack(stack: &Stack) -> Result<Router, GatewayError> {
    let registry = FunctionRegistry::from_stack(stack)?;
    create_router(&stack.routes, &registry, &stack.api.cors)
}

/// Build the router for `routes`, dispatching to the handlers in `registry`.
///
/// # Errors
/// Returns [`GatewayError::UnregisteredFunction`] if a route's function is
/// not in `registry`, [`GatewayError::UnsupportedMethod`] for an unmountable method,
/// and [`GatewayError::InvalidOrigin`] for a malformed CORS origin.
pub fn create_router(
    routes: &[Route],
    registry: &FunctionRegistry,
    cors: &CorsPolicy,
) -> Result<Router, GatewayError> {
    let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();

    for route in routes {
        let kind = registry
            .get(&route.function)
            .ok_or_else(|| GatewayError::UnregisteredFunction(route.function.clone()))?;
        let filter = method_filter(route.method)?;
        let handler = move |method: Method,
                            uri: Uri,
                            headers: HeaderMap,
                            path: Result<Path<BTreeMap<String, String>>, PathRejection>,
                            query: Result<Query<BTreeMap<String, String>>, QueryRejection>,
                            body: Bytes| async move {
            let parameters = match (path_parameters(path), query) {
                (Ok(path), Ok(Query(query))) => (path, query),
                (Err(err), _) => return err.into_response(),
                (_, Err(rejection)) => return GatewayError::InvalidRequest(rejection.body_text()).into_response(),
            };
            dispatch(kind, &method, &uri, &headers, parameters, &body)
        };

        let path = route.path_string();
        tracing::debug!(path = %path, method = %route.method, function = %kind, "mounting route");
        let method_router = match by_path.remove(&path) {
            Some(existing) => existing.on(filter, handler),
            None => on(filter, handler),
        };
        by_path.insert(path, method_router);
    }

    let router = by_path
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| router.route(&path, method_router))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors)?);
    Ok(router)
}

fn method_filter(method: HttpMethod) -> Result<MethodFilter, GatewayError> {
    let filter = match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
        HttpMethod::Head => MethodFilter::HEAD,
        HttpMethod::Options => MethodFilter::OPTIONS,
        other => return Err(GatewayError::UnsupportedMethod(other)),
    };
    Ok(filter)
}

/// Mirrors the deployed API's CORS policy.
fn cors_layer(cors: &CorsPolicy) -> Result<CorsLayer, GatewayError> {
    if cors.is_permissive() {
        return Ok(CorsLayer::permissive());
    }

    let layer = match &cors.allow_origins {
        AllowedOrigins::List(origins) => {
            let origins = origins
                .iter()
                .map(|o| HeaderValue::from_str(o).map_err(|_| GatewayError::InvalidOrigin(o.clone())))
                .collect::<Result<Vec<_>, _>>()?;
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        }
        _ => CorsLayer::new().allow_origin(Any),
    };
    let layer = match &cors.allow_methods {
        AllowedMethods::List(methods) => layer.allow_methods(
            methods
                .iter()
                .filter_map(|m| Method::from_bytes(m.as_str().as_bytes()).ok())
                .collect::<Vec<_>>(),
        ),
        _ => layer.allow_methods(Any),
    };
    Ok(layer.allow_headers(Any))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /health`: liveness check.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

/// Percent-decoded `{name}` captures. A route without captures yields none.
fn path_parameters(
    path: Result<Path<BTreeMap<String, String>>, PathRejection>,
) -> Result<BTreeMap<String, String>, GatewayError> {
    match path {
        Ok(Path(parameters)) => Ok(parameters),
        Err(PathRejection::MissingPathParams(_)) => Ok(BTreeMap::new()),
        Err(rejection) => Err(GatewayError::InvalidRequest(rejection.body_text())),
    }
}

fn dispatch(
    kind: FunctionKind,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    (path, query): (BTreeMap<String, String>, BTreeMap<String, String>),
    body: &Bytes,
) -> Response {
    let request_id = Uuid::new_v4();
    let received_at = Utc::now();

    let mut request = ApiRequest::new(method.as_str(), uri.path()).with_request_id(request_id.to_string());
    request.path_parameters = path;
    request.query_parameters = query;
    request.headers = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned())))
        .collect();
    if !body.is_empty() {
        request.body = Some(String::from_utf8_lossy(body).into_owned());
    }

    let response = invoke(kind, &request);
    tracing::info!(
        request_id = %request_id,
        received_at = %received_at.to_rfc3339(),
        function = %kind,
        method = %method,
        path = %uri.path(),
        status = response.status_code,
        "request handled"
    );
    into_response(response, request_id)
}

fn into_response(response: ApiResponse, request_id: Uuid) -> Response {
    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out = (status, response.body).into_response();
    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            headers.insert(name, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use smart_access_core::{assemble, DeployEnvironment, StackConfig};
    use tower::ServiceExt;

    fn app() -> Router {
        let stack = match assemble(&StackConfig::new(DeployEnvironment::Staging)) {
            Ok(s) => s,
            Err(e) => panic!("assembly failed: {e}"),
        };
        match router_for_stack(&stack) {
            Ok(r) => r,
            Err(e) => panic!("router failed: {e}"),
        }
    }

    async fn send(method: &str, uri: &str, body: Body) -> (StatusCode, HeaderMap, String) {
        let req = match Request::builder().method(method).uri(uri).body(body) {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        };
        let resp = match app().oneshot(req).await {
            Ok(r) => r,
            Err(e) => panic!("handler error: {e}"),
        };
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = match axum::body::to_bytes(resp.into_body(), 64 * 1024).await {
            Ok(b) => b,
            Err(e) => panic!("failed to read body: {e}"),
        };
        (status, headers, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn health_response_format_returns_ok_with_status_field() {
        let (status, _, body) = send("GET", "/health", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => panic!("invalid JSON: {e}"),
        };
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn get_user_echoes_path_parameter() {
        let (status, headers, body) = send("GET", "/users/42", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"message":"get userId: 42!"}"#);
        assert_eq!(
            headers.get("content-type").and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert!(headers.contains_key(REQUEST_ID_HEADER), "every response carries a request id");
    }

    #[tokio::test]
    async fn list_and_create_return_empty_object() {
        let (status, _, body) = send("GET", "/users", Body::empty()).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "{}"));

        let (status, _, body) = send("POST", "/users", Body::from(r#"{"name":"ada"}"#)).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "{}"));
    }

    #[tokio::test]
    async fn malformed_create_body_is_rejected() {
        let (status, _, body) = send("POST", "/users", Body::from("{oops")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("invalid request body"), "unexpected body: {body}");
    }

    #[tokio::test]
    async fn unrouted_method_is_not_allowed() {
        let (status, _, _) = send("DELETE", "/users/42", Body::empty()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn permissive_cors_allows_any_origin() {
        let req = match Request::builder()
            .method("OPTIONS")
            .uri("/users")
            .header("origin", "https://example.com")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
        {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        };
        let resp = match app().oneshot(req).await {
            Ok(r) => r,
            Err(e) => panic!("handler error: {e}"),
        };
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn path_parameters_are_percent_decoded() {
        let (status, _, body) = send("GET", "/users/a%20b", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"message":"get userId: a b!"}"#);
    }

    #[tokio::test]
    async fn undecodable_path_parameter_is_a_bad_request() {
        let (status, headers, body) = send("GET", "/users/%FF", Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("invalid request"), "unexpected body: {body}");
        assert_eq!(
            headers.get("content-type").and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[test]
    fn route_without_registered_function_is_rejected() {
        let stack = match assemble(&StackConfig::new(DeployEnvironment::Staging)) {
            Ok(s) => s,
            Err(e) => panic!("assembly failed: {e}"),
        };
        match create_router(&stack.routes, &FunctionRegistry::default(), &stack.api.cors) {
            Err(GatewayError::UnregisteredFunction(id)) => assert_eq!(id, stack.routes[0].function),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("router built without handlers"),
        }
    }
}
