//! Pipeline execution.
//!
//! The engine folds a request through its request steps, dispatches it, and
//! folds the resulting exchange through its response steps. Retries re-enter
//! the whole pipeline in a bounded loop.

mod engine;

pub use engine::{run, Pipeline, MAX_ATTEMPTS};
