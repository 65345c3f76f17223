//! HTTP API, its routes, and the resource tree they imply.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::LogicalId;

/// Stage the API is deployed to.
pub const DEFAULT_STAGE: &str = "prod";

/// Function environment variable carrying the `Access-Control-Allow-Origin`
/// value proxied responses must include.
pub const ALLOW_ORIGIN_ENV: &str = "ALLOW_ORIGIN";

/// Headers allowed on CORS preflight responses.
pub const DEFAULT_CORS_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-User-Agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Every method, in the order used for the CORS allow-methods header.
    pub const ALL: [Self; 7] = [
        Self::Options,
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Patch,
        Self::Head,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AllowedOrigins {
    All,
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AllowedMethods {
    All,
    List(Vec<HttpMethod>),
}

/// Cross-origin policy applied to every route of the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct CorsPolicy {
    pub allow_origins: AllowedOrigins,
    pub allow_methods: AllowedMethods,
    pub allow_headers: String,
}

impl CorsPolicy {
    /// All origins, all methods.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            allow_origins: AllowedOrigins::All,
            allow_methods: AllowedMethods::All,
            allow_headers: DEFAULT_CORS_HEADERS.to_owned(),
        }
    }

    #[must_use]
    pub fn is_permissive(&self) -> bool {
        self.allow_origins == AllowedOrigins::All && self.allow_methods == AllowedMethods::All
    }

    /// Value of `Access-Control-Allow-Origin`.
    #[must_use]
    pub fn allowed_origin_header(&self) -> String {
        match &self.allow_origins {
            AllowedOrigins::All => "*".to_owned(),
            AllowedOrigins::List(origins) => origins.join(","),
        }
    }

    /// Value of `Access-Control-Allow-Methods`.
    #[must_use]
    pub fn allowed_methods_header(&self) -> String {
        let methods: &[HttpMethod] = match &self.allow_methods {
            AllowedMethods::All => HttpMethod::ALL.as_slice(),
            AllowedMethods::List(methods) => methods.as_slice(),
        };
        methods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(",")
    }
}

/// Authorization applied to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Authorization {
    None,
}

impl Authorization {
    #[must_use]
    pub const fn provider_type(self) -> &'static str {
        match self {
            Self::None => "NONE",
        }
    }
}

/// One segment of a route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PathSegment {
    Literal(String),
    /// A captured path parameter, written `{name}`.
    Parameter(String),
}

impl PathSegment {
    /// Parses `users` or `{id}`.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] for empty segments, unbalanced braces,
    /// or characters outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (inner, is_param) = match raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            Some(name) => (name, true),
            None => (raw, false),
        };
        let valid = !inner.is_empty()
            && inner
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(CoreError::validation("route", "path", format!("invalid segment '{raw}'")));
        }
        Ok(if is_param {
            Self::Parameter(inner.to_owned())
        } else {
            Self::Literal(inner.to_owned())
        })
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.write_str(s),
            Self::Parameter(name) => write!(f, "{{{name}}}"),
        }
    }
}

/// A `(path, method)` pair bound to one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Route {
    pub path: Vec<PathSegment>,
    pub method: HttpMethod,
    pub function: LogicalId,
    pub authorization: Authorization,
}

impl Route {
    /// Parses a path such as `/users/{id}` into an unauthenticated route.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] if the path does not start with `/`
    /// or contains an invalid segment.
    pub fn new(method: HttpMethod, path: &str, function: LogicalId) -> Result<Self, CoreError> {
        let Some(rest) = path.strip_prefix('/') else {
            return Err(CoreError::validation("route", "path", format!("'{path}' must start with '/'")));
        };
        let path = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').map(PathSegment::parse).collect::<Result<_, _>>()?
        };
        Ok(Self {
            path,
            method,
            function,
            authorization: Authorization::None,
        })
    }

    /// The path with parameters in braces, e.g. `/users/{id}`.
    #[must_use]
    pub fn path_string(&self) -> String {
        render_path(&self.path)
    }

    /// Names of the captured path parameters, in order.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.path.iter().filter_map(|s| match s {
            PathSegment::Parameter(name) => Some(name.as_str()),
            PathSegment::Literal(_) => None,
        })
    }
}

fn render_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }
    path.iter().fold(String::new(), |mut acc, seg| {
        acc.push('/');
        acc.push_str(&seg.to_string());
        acc
    })
}

/// The stack's single HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RestApi {
    pub id: LogicalId,
    /// Public name, chosen by environment.
    pub name: String,
    pub cors: CorsPolicy,
    pub stage_name: String,
}

impl RestApi {
    /// An API with a permissive CORS policy on the default stage.
    #[must_use]
    pub fn new(id: LogicalId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cors: CorsPolicy::permissive(),
            stage_name: DEFAULT_STAGE.to_owned(),
        }
    }
}

/// Where an API resource hangs in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ResourceParent {
    /// The API's implicit `/` resource.
    Root,
    Resource(LogicalId),
}

/// A path node of the API, one per distinct route prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ApiResource {
    pub id: LogicalId,
    pub parent: ResourceParent,
    pub path_part: PathSegment,
    pub path: Vec<PathSegment>,
}

impl ApiResource {
    #[must_use]
    pub fn path_string(&self) -> String {
        render_path(&self.path)
    }
}

/// Path nodes implied by a set of routes, parents before children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ResourceTree {
    pub resources: Vec<ApiResource>,
}

impl ResourceTree {
    /// Builds the tree in first-seen order.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidLogicalId`] if a derived id is invalid.
    pub fn from_routes(api: &LogicalId, routes: &[Route]) -> Result<Self, CoreError> {
        let mut tree = Self::default();
        for route in routes {
            for depth in 1..=route.path.len() {
                let path = &route.path[..depth];
                if tree.find(path).is_some() {
                    continue;
                }
                let parent = if depth == 1 {
                    ResourceParent::Root
                } else {
                    match tree.find(&path[..depth - 1]) {
                        Some(parent) => ResourceParent::Resource(parent.id.clone()),
                        None => ResourceParent::Root,
                    }
                };
                let mut id_parts: Vec<String> = vec![api.to_string()];
                id_parts.extend(path.iter().map(|seg| match seg {
                    PathSegment::Literal(s) | PathSegment::Parameter(s) => s.clone(),
                }));
                let parts: Vec<&str> = id_parts.iter().map(String::as_str).collect();
                tree.resources.push(ApiResource {
                    id: LogicalId::from_path(&parts)?,
                    parent,
                    path_part: path[depth - 1].clone(),
                    path: path.to_vec(),
                });
            }
        }
        Ok(tree)
    }

    /// The resource for an exact path, if any.
    #[must_use]
    pub fn find(&self, path: &[PathSegment]) -> Option<&ApiResource> {
        self.resources.iter().find(|r| r.path == path)
    }
}
