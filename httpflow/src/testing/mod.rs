//! Testing utilities for httpflow pipelines.
//!
//! This module provides:
//! - Scripted and echoing adapters
//! - A sleeper that records retry delays instead of waiting
//! - Fixtures for compressed and JSON payloads
//! - Assertions over pipeline outcomes

mod assertions;
mod fixtures;
mod mocks;

pub use crate::events::CollectingEventSink;
pub use assertions::{
    assert_header, assert_json_body, assert_status, assert_transport_error,
};
pub use fixtures::{deflate, gzip, json_response};
pub use mocks::{EchoAdapter, MockAdapter, RecordedRequest, RecordingSleeper};
