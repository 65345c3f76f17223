//! Transport-neutral request and response records.
//!
//! The lambda adapter and the local gateway both translate into these, so
//! handlers never see a transport type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::FunctionError;

pub const CONTENT_TYPE: &str = "content-type";
pub const APPLICATION_JSON: &str = "application/json";
pub const ACCESS_CONTROL_ALLOW_ORIGIN: &str = "access-control-allow-origin";

/// An inbound proxied API request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ApiRequest {
    pub http_method: String,
    pub path: String,
    pub path_parameters: BTreeMap<String, String>,
    pub query_parameters: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub request_id: Option<String>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(http_method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Adds a path parameter.
    #[must_use]
    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// The named path parameter, if present and non-empty.
    ///
    /// # Errors
    /// Returns [`FunctionError::MissingPathParameter`] otherwise.
    pub fn path_parameter(&self, name: &str) -> Result<&str, FunctionError> {
        self.path_parameters
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FunctionError::MissingPathParameter(name.to_owned()))
    }
}

/// An outbound API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    /// A JSON response; the content type is always `application/json`.
    ///
    /// # Errors
    /// Returns [`FunctionError::Internal`] if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(status_code: u16, body: &T) -> Result<Self, FunctionError> {
        let body = serde_json::to_string(body).map_err(|e| FunctionError::Internal(e.to_string()))?;
        Ok(Self::raw_json(status_code, body))
    }

    /// Sets `name` to `value`, replacing any earlier value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// `200 {}`
    #[must_use]
    pub fn empty_json() -> Self {
        Self::raw_json(200, "{}".to_owned())
    }

    fn raw_json(status_code: u16, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE.to_owned(), APPLICATION_JSON.to_owned());
        Self {
            status_code,
            headers,
            body,
        }
    }
}

impl From<FunctionError> for ApiResponse {
    fn from(err: FunctionError) -> Self {
        let body = json!({ "error": err.to_string() }).to_string();
        Self::raw_json(err.status_code(), body)
    }
}
