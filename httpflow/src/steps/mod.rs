//! Steps: the atomic units of pipeline behavior.
//!
//! A step is a closed variant over three shapes, all resolved by [`invoke`]:
//!
//! - a closure over the phase state,
//! - a handler with positional arguments,
//! - a handler with an options map (a bare handler is one with empty options).
//!
//! Steps signal control flow through their return value: [`RequestFlow`] in
//! the request phase and [`ResponseFlow`] in the response phase. The shapes
//! are fixed by the type system; a step that cannot produce one returns an
//! [`HttpflowError`], which aborts the pipeline.

mod registry;
pub mod request;
pub mod response;
pub mod telemetry;

pub use registry::StepRegistry;
pub use request::{
    AdapterStep, AuthStep, EncodeBody, EncodeHeaders, ProxyDefinition, ProxyStep,
    PutDefaultHeaders, PutParams,
};
pub use response::{DecodeBody, DecompressBody, DowncaseHeaders};
pub use telemetry::{LogRequestStart, LogResponseEnd};

use crate::core::{Exchange, Request};
use crate::errors::HttpflowError;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Result type returned by every step.
pub type StepResult<F> = Result<F, HttpflowError>;

/// A pipeline phase: fixes the state a step receives and the signal it returns.
pub trait Phase: Send + Sync + 'static {
    /// State handed to each step.
    type State: Send + 'static;
    /// Control-flow signal returned by each step.
    type Flow: Send + 'static;
    /// Phase name used in logs.
    const NAME: &'static str;
}

/// The request-build phase.
#[derive(Debug, Clone, Copy)]
pub struct RequestPhase;

/// The unified response/error phase.
#[derive(Debug, Clone, Copy)]
pub struct ResponsePhase;

impl Phase for RequestPhase {
    type State = Request;
    type Flow = RequestFlow;
    const NAME: &'static str = "request";
}

impl Phase for ResponsePhase {
    type State = Exchange;
    type Flow = ResponseFlow;
    const NAME: &'static str = "response";
}

/// Signal returned by a request step.
#[derive(Debug)]
pub enum RequestFlow {
    /// Keep folding request steps.
    Continue(Request),
    /// The exchange happened; move on to the response phase.
    Dispatched(Exchange),
    /// Stop the whole pipeline with this result.
    Halt(Exchange),
}

/// Signal returned by a response step.
#[derive(Debug)]
pub enum ResponseFlow {
    /// Keep folding response steps.
    Continue(Exchange),
    /// Stop the fold with this result.
    Halt(Exchange),
    /// Stop the fold and re-run the pipeline from the top.
    Retry(Exchange),
}

/// Extra arguments a handler step was registered with.
#[derive(Debug, Clone, Copy)]
pub enum StepArgs<'a> {
    /// Bare handler.
    None,
    /// Positional arguments.
    Args(&'a [Value]),
    /// Named options.
    Options(&'a Map<String, Value>),
}

impl<'a> StepArgs<'a> {
    /// Returns a named option.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&'a Value> {
        match self {
            Self::Options(options) => options.get(key),
            _ => None,
        }
    }

    /// Returns a positional argument.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        match self {
            Self::Args(args) => args.get(index),
            _ => None,
        }
    }
}

/// A named handler with a uniform entry point.
#[async_trait]
pub trait StepHandler<P: Phase>: Send + Sync + fmt::Debug {
    /// Name used in logs and in the step registry.
    fn name(&self) -> &str;

    /// Runs the handler over the phase state.
    async fn run(&self, state: P::State, args: StepArgs<'_>) -> StepResult<P::Flow>;
}

type StepFn<P> =
    dyn Fn(<P as Phase>::State) -> BoxFuture<'static, StepResult<<P as Phase>::Flow>> + Send + Sync;

/// A step in one phase of the pipeline.
pub enum Step<P: Phase> {
    /// A function over the phase state.
    Closure {
        /// Name used in logs.
        name: Arc<str>,
        /// The function.
        func: Arc<StepFn<P>>,
    },
    /// A handler invoked with positional arguments.
    HandlerWithArgs {
        /// The handler.
        handler: Arc<dyn StepHandler<P>>,
        /// Extra arguments.
        args: Vec<Value>,
    },
    /// A handler invoked with an options map.
    HandlerWithOptions {
        /// The handler.
        handler: Arc<dyn StepHandler<P>>,
        /// Options, possibly empty.
        options: Map<String, Value>,
    },
}

impl<P: Phase> Step<P> {
    /// Wraps an async function.
    pub fn func<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(P::State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult<P::Flow>> + Send + 'static,
    {
        Self::Closure {
            name: Arc::from(name.into()),
            func: Arc::new(move |state: P::State| f(state).boxed()),
        }
    }

    /// Wraps a synchronous function.
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(P::State) -> StepResult<P::Flow> + Send + Sync + 'static,
    {
        Self::func(name, move |state: P::State| futures::future::ready(f(state)))
    }

    /// Wraps a bare handler, invoked with no options.
    pub fn handler(handler: impl StepHandler<P> + 'static) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    /// Wraps a shared bare handler.
    #[must_use]
    pub fn from_arc(handler: Arc<dyn StepHandler<P>>) -> Self {
        Self::HandlerWithOptions {
            handler,
            options: Map::new(),
        }
    }

    /// Wraps a handler with positional arguments.
    pub fn with_args(handler: impl StepHandler<P> + 'static, args: Vec<Value>) -> Self {
        Self::HandlerWithArgs {
            handler: Arc::new(handler),
            args,
        }
    }

    /// Wraps a handler with an options map.
    pub fn with_options(handler: impl StepHandler<P> + 'static, options: Map<String, Value>) -> Self {
        Self::HandlerWithOptions {
            handler: Arc::new(handler),
            options,
        }
    }

    /// Returns the step's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Closure { name, .. } => name.as_ref(),
            Self::HandlerWithArgs { handler, .. } | Self::HandlerWithOptions { handler, .. } => {
                handler.name()
            }
        }
    }
}

impl<P: Phase> Clone for Step<P> {
    fn clone(&self) -> Self {
        match self {
            Self::Closure { name, func } => Self::Closure {
                name: Arc::clone(name),
                func: Arc::clone(func),
            },
            Self::HandlerWithArgs { handler, args } => Self::HandlerWithArgs {
                handler: Arc::clone(handler),
                args: args.clone(),
            },
            Self::HandlerWithOptions { handler, options } => Self::HandlerWithOptions {
                handler: Arc::clone(handler),
                options: options.clone(),
            },
        }
    }
}

impl<P: Phase> fmt::Debug for Step<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closure { name, .. } => f.debug_struct("Closure").field("name", name).finish(),
            Self::HandlerWithArgs { handler, args } => f
                .debug_struct("HandlerWithArgs")
                .field("handler", &handler.name())
                .field("args", args)
                .finish(),
            Self::HandlerWithOptions { handler, options } => f
                .debug_struct("HandlerWithOptions")
                .field("handler", &handler.name())
                .field("options", options)
                .finish(),
        }
    }
}

/// Applies a step to the phase state and returns its signal verbatim.
pub async fn invoke<P: Phase>(step: &Step<P>, state: P::State) -> StepResult<P::Flow> {
    match step {
        Step::Closure { func, .. } => func(state).await,
        Step::HandlerWithArgs { handler, args } => handler.run(state, StepArgs::Args(args)).await,
        Step::HandlerWithOptions { handler, options } => {
            let args = if options.is_empty() {
                StepArgs::None
            } else {
                StepArgs::Options(options)
            };
            handler.run(state, args).await
        }
    }
}
