//! The users API handlers.
//!
//! Listing and creating users are placeholders that acknowledge the request
//! with an empty JSON object; storage is not wired up yet.

use serde_json::{json, Value};

use crate::error::FunctionError;
use crate::request::{ApiRequest, ApiResponse};

/// Name of the path parameter carrying the user id.
pub const USER_ID_PARAMETER: &str = "id";

/// `GET /users`
///
/// # Errors
/// Never fails today; the signature leaves room for a storage backend.
pub fn get_all(request: &ApiRequest) -> Result<ApiResponse, FunctionError> {
    tracing::info!(request_id = ?request.request_id, "listing users");
    Ok(ApiResponse::empty_json())
}

/// `POST /users`
///
/// # Errors
/// Returns [`FunctionError::InvalidBody`] if a body is present and is not JSON.
pub fn create(request: &ApiRequest) -> Result<ApiResponse, FunctionError> {
    if let Some(body) = request.body.as_deref() {
        serde_json::from_str::<Value>(body).map_err(|e| FunctionError::InvalidBody(e.to_string()))?;
    }
    tracing::info!(request_id = ?request.request_id, "creating user");
    Ok(ApiResponse::empty_json())
}

/// `GET /users/{id}`
///
/// # Errors
/// Returns [`FunctionError::MissingPathParameter`] if `id` is absent or empty.
pub fn get_one(request: &ApiRequest) -> Result<ApiResponse, FunctionError> {
    let user_id = request.path_parameter(USER_ID_PARAMETER)?;
    tracing::info!(request_id = ?request.request_id, user_id, "fetching user");
    ApiResponse::json(200, &json!({ "message": format!("get userId: {user_id}!") }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(result: Result<ApiResponse, FunctionError>) -> ApiResponse {
        match result {
            Ok(r) => r,
            Err(e) => panic!("handler failed: {e}"),
        }
    }

    #[test]
    fn get_one_greets_user_id() {
        let request = ApiRequest::new("GET", "/users/42").with_path_parameter("id", "42");
        let response = ok(get_one(&request));
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, r#"{"message":"get userId: 42!"}"#);
    }

    #[test]
    fn get_one_without_id_is_rejected() {
        let request = ApiRequest::new("GET", "/users/");
        assert_eq!(
            get_one(&request),
            Err(FunctionError::MissingPathParameter("id".to_owned()))
        );
    }

    #[test]
    fn get_all_returns_empty_object() {
        let response = ok(get_all(&ApiRequest::new("GET", "/users")));
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "{}");
    }

    #[test]
    fn create_accepts_json_or_no_body() {
        let with_body = ApiRequest::new("POST", "/users").with_body(r#"{"name":"ada"}"#);
        assert_eq!(ok(create(&with_body)).body, "{}");
        assert_eq!(ok(create(&ApiRequest::new("POST", "/users"))).status_code, 200);
    }

    #[test]
    fn create_rejects_malformed_body() {
        let request = ApiRequest::new("POST", "/users").with_body("{not json");
        assert!(matches!(create(&request), Err(FunctionError::InvalidBody(_))));
    }
}
