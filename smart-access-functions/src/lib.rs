//! Request handlers behind the smart-access users API.
//!
//! Handlers work on the transport-neutral [`ApiRequest`]/[`ApiResponse`]
//! pair. [`lambda`] adapts them to the lambda runtime; the local gateway
//! calls [`invoke`] directly.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod handlers;
pub mod kind;
pub mod lambda;
pub mod request;

pub use error::FunctionError;
pub use kind::{invoke, FunctionKind};
pub use request::{ApiRequest, ApiResponse};
