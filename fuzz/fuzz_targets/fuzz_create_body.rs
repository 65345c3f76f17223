//! Fuzz target: the create-user handler with arbitrary bodies.
//!
//! The handler must answer every body with 200 or 400 and never reach the
//! panic fallback.

#![no_main]

use libfuzzer_sys::fuzz_target;
use smart_access_functions::{invoke, ApiRequest, FunctionKind};

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data).into_owned();
    let request = ApiRequest::new("POST", "/users").with_body(body);
    let response = invoke(FunctionKind::Create, &request);
    assert!(
        response.status_code == 200 || response.status_code == 400,
        "unexpected status {}",
        response.status_code
    );
});
