//! Lambda runtime adapter.
//!
//! Translates API Gateway proxy events into [`ApiRequest`] and
//! [`ApiResponse`] back into a proxy response.

use lambda_http::{service_fn, Body, Error as LambdaError, Request, RequestExt, Response};

use crate::kind::{invoke, FunctionKind};
use crate::request::{ApiRequest, ApiResponse, ACCESS_CONTROL_ALLOW_ORIGIN};

/// Origin allowed when the function environment names none.
pub const DEFAULT_ALLOW_ORIGIN: &str = "*";

/// Starts the lambda runtime serving `kind` until the runtime shuts down.
///
/// Every response carries `Access-Control-Allow-Origin: <allow_origin>`.
///
/// # Errors
/// Returns the runtime's error if the event loop fails.
pub async fn run(kind: FunctionKind, allow_origin: String) -> Result<(), LambdaError> {
    tracing::info!(function = %kind, allow_origin = %allow_origin, "starting lambda runtime");
    lambda_http::run(service_fn(move |event: Request| {
        let allow_origin = allow_origin.clone();
        async move { handle(kind, &event, &allow_origin) }
    }))
    .await
}

/// Handles one proxy event.
///
/// # Errors
/// Returns an error only if the response cannot be built.
pub fn handle(
    kind: FunctionKind,
    event: &Request,
    allow_origin: &str,
) -> Result<Response<Body>, LambdaError> {
    let request = to_api_request(event);
    let response =
        invoke(kind, &request).with_header(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    tracing::debug!(
        function = %kind,
        request_id = ?request.request_id,
        status = response.status_code,
        "request handled"
    );
    into_lambda_response(response)
}

/// Converts a proxy event into the handler request record.
#[must_use]
pub fn to_api_request(event: &Request) -> ApiRequest {
    let mut request = ApiRequest::new(event.method().as_str(), event.uri().path());

    request.path_parameters = event
        .path_parameters_ref()
        .map(|params| params.iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect())
        .unwrap_or_default();
    request.query_parameters = event
        .query_string_parameters_ref()
        .map(|params| params.iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect())
        .unwrap_or_default();
    request.headers = event
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();

    let body: &[u8] = event.body().as_ref();
    if !body.is_empty() {
        request.body = Some(String::from_utf8_lossy(body).into_owned());
    }
    request.request_id = event.lambda_context_ref().map(|ctx| ctx.request_id.clone());

    request
}

/// Converts a handler response into a proxy response.
///
/// # Errors
/// Returns an error if a header name or value is not valid HTTP.
pub fn into_lambda_response(response: ApiResponse) -> Result<Response<Body>, LambdaError> {
    let mut builder = Response::builder().status(response.status_code);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let rsp = builder.body(Body::from(response.body)).map_err(Box::new)?;
    Ok(rsp)
}
