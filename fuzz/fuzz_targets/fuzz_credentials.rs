//! Fuzz target: credential extraction from request headers.
//!
//! Arbitrary header values must never panic the extractor, and an
//! extracted token is never empty.

#![no_main]

use axum::http::{HeaderMap, HeaderValue};
use forms_gateway::auth::Credentials;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut parts = data.splitn(3, |b| *b == b'\n');
    let mut headers = HeaderMap::new();
    for name in ["authorization", "access-token", "uid"] {
        let Some(raw) = parts.next() else { break };
        if let Ok(value) = HeaderValue::from_bytes(raw) {
            headers.insert(name, value);
        }
    }

    if let Some(credentials) = Credentials::from_headers(&headers) {
        assert!(!credentials.token.is_empty(), "extracted token must not be empty");
    }
});
