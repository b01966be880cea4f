//! Assertions over pipeline outcomes.

use crate::core::{Outcome, Response};
use crate::errors::TransportErrorKind;

/// Asserts that the outcome is a response with the expected status.
pub fn assert_status(outcome: &Outcome, expected: u16) {
    match outcome {
        Ok(response) => assert_eq!(
            response.status, expected,
            "Expected status {expected}, got {}",
            response.status
        ),
        Err(error) => panic!("Expected status {expected}, got transport error: {error}"),
    }
}

/// Asserts that the outcome is a transport error of the expected kind.
pub fn assert_transport_error(outcome: &Outcome, expected: TransportErrorKind) {
    match outcome {
        Err(error) => assert_eq!(
            error.kind, expected,
            "Expected {expected} error, got {}",
            error.kind
        ),
        Ok(response) => panic!(
            "Expected {expected} error, got response with status {}",
            response.status
        ),
    }
}

/// Asserts that the response carries a header with the expected value.
pub fn assert_header(response: &Response, name: &str, expected: &str) {
    assert_eq!(
        response.header(name),
        Some(expected),
        "Expected header '{name}: {expected}'. Headers: {:?}",
        response.headers.names()
    );
}

/// Asserts that the response body was decoded into the expected JSON.
pub fn assert_json_body(response: &Response, expected: &serde_json::Value) {
    assert_eq!(
        response.body.as_json(),
        Some(expected),
        "Expected decoded JSON body {expected}, got {:?}",
        response.body
    );
}
