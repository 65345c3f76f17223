//! Handler dispatch shared by every transport.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use serde_json::json;
use smart_access_core::{USERS_CREATE_ENTRY, USERS_GET_ENTRY, USERS_LIST_ENTRY};

use crate::error::FunctionError;
use crate::handlers;
use crate::request::{ApiRequest, ApiResponse};

/// One deployable handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FunctionKind {
    List,
    Create,
    Get,
}

impl FunctionKind {
    pub const ALL: [Self; 3] = [Self::List, Self::Create, Self::Get];

    /// Package entry this handler is built and deployed under.
    #[must_use]
    pub const fn entry(self) -> &'static str {
        match self {
            Self::List => USERS_LIST_ENTRY,
            Self::Create => USERS_CREATE_ENTRY,
            Self::Get => USERS_GET_ENTRY,
        }
    }

    /// The handler deployed under `entry`.
    #[must_use]
    pub fn from_entry(entry: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.entry() == entry)
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry())
    }
}

/// Runs the handler for `kind` and always produces a response.
///
/// Handler errors become their error response; a panic becomes
/// `500 {"error":"internal server error"}`.
#[must_use]
pub fn invoke(kind: FunctionKind, request: &ApiRequest) -> ApiResponse {
    guarded(kind, || match kind {
        FunctionKind::List => handlers::get_all(request),
        FunctionKind::Create => handlers::create(request),
        FunctionKind::Get => handlers::get_one(request),
    })
}

/// Runs `handler` on behalf of `kind`, turning its error or panic into a response.
fn guarded<F>(kind: FunctionKind, handler: F) -> ApiResponse
where
    F: FnOnce() -> Result<ApiResponse, FunctionError>,
{
    match panic::catch_unwind(AssertUnwindSafe(handler)) {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            tracing::warn!(function = %kind, error = %err, "handler rejected request");
            ApiResponse::from(err)
        }
        Err(_) => {
            tracing::error!(function = %kind, "handler panicked");
            internal_error()
        }
    }
}

fn internal_error() -> ApiResponse {
    match ApiResponse::json(500, &json!({ "error": "internal server error" })) {
        Ok(response) => response,
        Err(err) => ApiResponse::from(err),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn entries_round_trip() {
        for kind in FunctionKind::ALL {
            assert_eq!(FunctionKind::from_entry(kind.entry()), Some(kind));
        }
        assert_eq!(FunctionKind::from_entry("users-delete"), None);
    }

    #[test]
    fn errors_become_responses() {
        let response = invoke(FunctionKind::Get, &ApiRequest::new("GET", "/users/"));
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body, r#"{"error":"missing path parameter: id"}"#);
    }

    #[test]
    fn panicking_handler_becomes_internal_error() {
        let response = guarded(FunctionKind::Get, || panic!("handler blew up"));
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, r#"{"error":"internal server error"}"#);
        assert_eq!(response.headers["content-type"], "application/json");
    }

    #[test]
    fn guarded_passes_through_handler_results() {
        let ok = guarded(FunctionKind::List, || Ok(ApiResponse::empty_json()));
        assert_eq!((ok.status_code, ok.body.as_str()), (200, "{}"));

        let rejected = guarded(FunctionKind::Create, || {
            Err(FunctionError::InvalidBody("eof".to_owned()))
        });
        assert_eq!(rejected.status_code, 400);
    }

    proptest! {
        #[test]
        fn get_echoes_any_nonempty_id(id in "[A-Za-z0-9_-]{1,32}") {
            let request = ApiRequest::new("GET", format!("/users/{id}")).with_path_parameter("id", id.clone());
            let response = invoke(FunctionKind::Get, &request);
            prop_assert_eq!(response.status_code, 200);
            let expected = format!(r#"{{"message":"get userId: {id}!"}}"#);
            prop_assert_eq!(response.body, expected);
        }

        #[test]
        fn create_never_faults(body in ".*") {
            let request = ApiRequest::new("POST", "/users").with_body(body);
            let response = invoke(FunctionKind::Create, &request);
            prop_assert!(response.status_code == 200 || response.status_code == 400);
        }
    }
}
