//! Name-based lookup of built-in steps.

use super::{
    AdapterStep, AuthStep, DecodeBody, DecompressBody, DowncaseHeaders, EncodeBody,
    EncodeHeaders, LogRequestStart, LogResponseEnd, Phase, PutDefaultHeaders, PutParams,
    RequestPhase, ResponsePhase, Step, StepHandler,
};
use crate::errors::HttpflowError;
use crate::events::EventSink;
use crate::retry::{RetryStep, Sleeper};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolves step names, as written in configuration, to bare-handler steps.
#[derive(Clone, Default)]
pub struct StepRegistry {
    request: HashMap<String, Arc<dyn StepHandler<RequestPhase>>>,
    response: HashMap<String, Arc<dyn StepHandler<ResponsePhase>>>,
}

impl StepRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in step.
    #[must_use]
    pub fn with_builtins(sink: Arc<dyn EventSink>, sleeper: Arc<dyn Sleeper>) -> Self {
        let mut registry = Self::new();
        registry
            .register_request(Arc::new(EncodeHeaders))
            .register_request(Arc::new(PutDefaultHeaders))
            .register_request(Arc::new(EncodeBody))
            .register_request(Arc::new(AuthStep))
            .register_request(Arc::new(PutParams))
            .register_request(Arc::new(LogRequestStart::new(Arc::clone(&sink))))
            .register_request(Arc::new(AdapterStep))
            .register_response(Arc::new(DowncaseHeaders))
            .register_response(Arc::new(DecompressBody))
            .register_response(Arc::new(DecodeBody))
            .register_response(Arc::new(RetryStep::new(sleeper)))
            .register_response(Arc::new(LogResponseEnd::new(sink)));
        registry
    }

    /// Registers a request handler under its own name, replacing any previous one.
    pub fn register_request(&mut self, handler: Arc<dyn StepHandler<RequestPhase>>) -> &mut Self {
        self.request.insert(handler.name().to_string(), handler);
        self
    }

    /// Registers a response handler under its own name, replacing any previous one.
    pub fn register_response(
        &mut self,
        handler: Arc<dyn StepHandler<ResponsePhase>>,
    ) -> &mut Self {
        self.response.insert(handler.name().to_string(), handler);
        self
    }

    /// Resolves a request step by name.
    pub fn request_step(&self, name: &str) -> Result<Step<RequestPhase>, HttpflowError> {
        lookup(&self.request, name)
    }

    /// Resolves a response step by name.
    pub fn response_step(&self, name: &str) -> Result<Step<ResponsePhase>, HttpflowError> {
        lookup(&self.response, name)
    }

    /// Resolves several request steps, failing on the first unknown name.
    pub fn request_steps(&self, names: &[String]) -> Result<Vec<Step<RequestPhase>>, HttpflowError> {
        names.iter().map(|name| self.request_step(name)).collect()
    }

    /// Resolves several response steps, failing on the first unknown name.
    pub fn response_steps(
        &self,
        names: &[String],
    ) -> Result<Vec<Step<ResponsePhase>>, HttpflowError> {
        names.iter().map(|name| self.response_step(name)).collect()
    }
}

fn lookup<P: Phase>(
    handlers: &HashMap<String, Arc<dyn StepHandler<P>>>,
    name: &str,
) -> Result<Step<P>, HttpflowError> {
    handlers
        .get(name)
        .map(|handler| Step::from_arc(Arc::clone(handler)))
        .ok_or_else(|| {
            HttpflowError::step_contract(name, format!("no {} step registered under this name", P::NAME))
        })
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut request: Vec<_> = self.request.keys().collect();
        let mut response: Vec<_> = self.response.keys().collect();
        request.sort();
        response.sort();
        f.debug_struct("StepRegistry")
            .field("request", &request)
            .field("response", &response)
            .finish()
    }
}
