//! Dispatcher core module - per-request state machine.
//!
//! ```text
//! Received --match--> Matched --resolve--> Resolved --invoke--> Invoked --> Responded
//!     |                  |                    |
//!     v                  v                    v
//!  NotFound     BindingFailed/EntityMissing  HandlerError/BindingFailed
//!                   HandlerError
//! ```
//!
//! Converter failures end in `HandlerError` straight from `Matched`. Handler
//! errors and panics end there from `Resolved`, as do typed request views
//! that refuse their arguments (`BindingFailed`).
//!
//! Each request makes a single fail-fast pass. Every failure is converted into
//! a [`DispatchOutcome`] at this boundary; nothing escapes as a panic or raw
//! error.

use crate::ids::RequestId;
use crate::resolver::{resolve_parameters, BoundValue, ConverterRegistry, EntityRecord, ResolveError};
use crate::router::{ParamVec, ReverseError, Router};
use crate::spec::{ConfigurationError, ParamType, RouteTable};
use http::Method;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

/// Maximum inline response headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 4;

/// Stack-allocated response header storage
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Transport-neutral request as handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub method: Method,
    /// Request path without query string
    ///
    /// [`DispatchRequest::new`] splits a `?query` suffix off into
    /// `query_params`.
    pub path: String,
    /// Raw request parameters (query string), in arrival order
    pub query_params: ParamVec,
}

impl DispatchRequest {
    /// Request for `path`; a `?query` suffix is parsed like [`from_target`].
    ///
    /// [`from_target`]: DispatchRequest::from_target
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        if path.contains('?') {
            return Self::from_target(method, &path);
        }
        DispatchRequest {
            method,
            path,
            query_params: ParamVec::new(),
        }
    }

    /// Split a request target (`/path?query`) into path and decoded
    /// query parameters.
    pub fn from_target(method: Method, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let query_params = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect();
        DispatchRequest {
            method,
            path: path.to_string(),
            query_params,
        }
    }

    #[must_use]
    pub fn with_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query_params.push((Arc::from(name), value.into()));
        self
    }
}

/// Arguments handed to a handler once its parameters are resolved.
#[derive(Debug, Clone)]
pub struct HandlerArgs {
    pub request_id: RequestId,
    pub method: Method,
    pub path: String,
    pub handler_name: String,
    /// Route name, when the matched route has one
    pub route_name: Option<String>,
    /// All variable bindings of the match, including ones no parameter
    /// consumed
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    /// Resolved parameters in declaration order
    pub values: Vec<(String, BoundValue)>,
}

impl HandlerArgs {
    /// Resolved value of a declared parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityRecord> {
        self.get(name).and_then(BoundValue::as_entity)
    }

    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(BoundValue::as_i64)
    }

    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(BoundValue::as_str)
    }

    /// Raw bound variable, whether or not a parameter consumed it
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to HashMap
    /// Note: This allocates - use get_path_param() where possible
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Response produced at the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 400, 404, 500)
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Handler result, or `{"error", "message"}` on failure
    pub body: Value,
}

impl HandlerResponse {
    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an error response with a machine-readable kind and a reason
    #[must_use]
    pub fn error(status: u16, kind: &str, message: &str) -> Self {
        Self::json(
            status,
            serde_json::json!({ "error": kind, "message": message }),
        )
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Position of a request in the dispatch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Received,
    Matched,
    Resolved,
    Invoked,
    Responded,
    NotFound,
    BindingFailed,
    EntityMissing,
    HandlerError,
}

impl DispatchState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Received => "received",
            DispatchState::Matched => "matched",
            DispatchState::Resolved => "resolved",
            DispatchState::Invoked => "invoked",
            DispatchState::Responded => "responded",
            DispatchState::NotFound => "not_found",
            DispatchState::BindingFailed => "binding_failed",
            DispatchState::EntityMissing => "entity_missing",
            DispatchState::HandlerError => "handler_error",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            DispatchState::Received
                | DispatchState::Matched
                | DispatchState::Resolved
                | DispatchState::Invoked
        )
    }

    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(&self, next: DispatchState) -> bool {
        use DispatchState::*;
        matches!(
            (self, next),
            (Received, Matched)
                | (Received, NotFound)
                | (Matched, Resolved)
                | (Matched, BindingFailed)
                | (Matched, EntityMissing)
                | (Matched, HandlerError)
                | (Resolved, Invoked)
                | (Resolved, BindingFailed)
                | (Resolved, HandlerError)
                | (Invoked, Responded)
        )
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request failure, caught at the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No route matched the method and path
    NoMatch { method: String, path: String },
    /// Parameter resolution failed
    Resolve(ResolveError),
    /// The route's handler has no registered function
    UnknownHandler { handler: String },
    /// The handler returned an error
    Handler { handler: String, message: String },
    /// The handler panicked
    HandlerPanic { handler: String, message: String },
}

impl DispatchError {
    /// Status code this failure maps to
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::NoMatch { .. } => 404,
            DispatchError::Resolve(e) if e.is_binding() => 400,
            DispatchError::Resolve(e) if e.is_not_found() => 404,
            _ => 500,
        }
    }

    /// Terminal state this failure ends in
    #[must_use]
    pub fn state(&self) -> DispatchState {
        match self {
            DispatchError::NoMatch { .. } => DispatchState::NotFound,
            DispatchError::Resolve(e) if e.is_binding() => DispatchState::BindingFailed,
            DispatchError::Resolve(e) if e.is_not_found() => DispatchState::EntityMissing,
            _ => DispatchState::HandlerError,
        }
    }

    /// Machine-readable error kind used in response bodies
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NoMatch { .. } => "no_match",
            DispatchError::Resolve(e) if e.is_binding() => "binding_error",
            DispatchError::Resolve(e) if e.is_not_found() => "entity_not_found",
            DispatchError::Resolve(_) => "converter_error",
            DispatchError::UnknownHandler { .. }
            | DispatchError::Handler { .. }
            | DispatchError::HandlerPanic { .. } => "handler_error",
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoMatch { method, path } => {
                write!(f, "no route matches {} {}", method, path)
            }
            DispatchError::Resolve(e) => write!(f, "{}", e),
            DispatchError::UnknownHandler { handler } => {
                write!(f, "handler '{}' is not registered", handler)
            }
            DispatchError::Handler { handler, message } => {
                write!(f, "handler '{}' failed: {}", handler, message)
            }
            DispatchError::HandlerPanic { handler, message } => {
                write!(f, "handler '{}' panicked: {}", handler, message)
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Final result of one dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub request_id: RequestId,
    /// Terminal state reached
    pub state: DispatchState,
    /// Every state visited, starting with `Received`
    pub trail: SmallVec<[DispatchState; 5]>,
    pub response: HandlerResponse,
    /// The failure, when `state` is not `Responded`
    pub error: Option<DispatchError>,
}

impl DispatchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == DispatchState::Responded
    }
}

/// Handler function signature. The returned JSON becomes a 200 response body.
pub type HandlerFn = Arc<dyn Fn(&HandlerArgs) -> anyhow::Result<Value> + Send + Sync>;

/// Handler functions keyed by handler identifier.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerFn>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler function. A function already registered under the
    /// same name is replaced.
    pub fn insert(&mut self, name: impl Into<String>, handler: HandlerFn) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            warn!(handler_name = %name, "Replaced existing handler function");
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HandlerFn> {
        self.handlers.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct Trail {
    request_id: RequestId,
    states: SmallVec<[DispatchState; 5]>,
}

impl Trail {
    fn new(request_id: RequestId) -> Self {
        let mut states = SmallVec::new();
        states.push(DispatchState::Received);
        Trail { request_id, states }
    }

    fn current(&self) -> DispatchState {
        self.states.last().copied().unwrap_or(DispatchState::Received)
    }

    fn advance(&mut self, next: DispatchState) {
        let from = self.current();
        debug_assert!(
            from.can_transition_to(next),
            "illegal dispatch transition {from} -> {next}"
        );
        debug!(request_id = %self.request_id, from = %from, to = %next, "Dispatch state transition");
        self.states.push(next);
    }
}

/// Dispatcher that matches, resolves and invokes handlers
///
/// Holds the route table, converter registry and handler registry by `Arc`;
/// none of them change after construction, so a dispatcher can be cloned and
/// shared across threads freely.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    router: Router,
    converters: Arc<ConverterRegistry>,
    handlers: Arc<HandlerRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher from explicitly supplied collaborators
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::MissingHandler`] if a route points at a handler
    /// with no registered function, [`ConfigurationError::MissingConverter`] if
    /// a routed handler declares an entity parameter whose type has no
    /// converter.
    pub fn new(
        table: Arc<RouteTable>,
        converters: Arc<ConverterRegistry>,
        handlers: Arc<HandlerRegistry>,
    ) -> Result<Self, ConfigurationError> {
        for route in table.definitions() {
            if handlers.get(&route.handler_name).is_none() {
                return Err(ConfigurationError::MissingHandler {
                    handler: route.handler_name.to_string(),
                });
            }
            for param in route.parameters.iter() {
                if let ParamType::Entity(entity) = &param.declared_type {
                    if !converters.contains(entity) {
                        return Err(ConfigurationError::MissingConverter {
                            handler: route.handler_name.to_string(),
                            parameter: param.name.clone(),
                            entity: entity.clone(),
                        });
                    }
                }
            }
        }
        info!(
            routes_count = table.len(),
            handlers_count = handlers.len(),
            converters = ?converters,
            "Dispatcher ready"
        );
        Ok(Dispatcher {
            router: Router::new(table),
            converters,
            handlers,
        })
    }

    /// Log route matches slower than `threshold` at warn level
    #[must_use]
    pub fn with_slow_match_threshold(mut self, threshold: std::time::Duration) -> Self {
        self.router = self.router.with_slow_match_threshold(threshold);
        self
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Reverse lookup through the router
    ///
    /// # Errors
    ///
    /// See [`Router::url_for`].
    pub fn url_for(
        &self,
        name: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, ReverseError> {
        self.router.url_for(name, variables)
    }

    /// Run one request through match, resolve and invoke
    ///
    /// Never fails: every error becomes a structured outcome whose response
    /// carries the mapped status code and `{"error", "message"}` body.
    #[must_use]
    pub fn dispatch(&self, request: &DispatchRequest) -> DispatchOutcome {
        let request_id = RequestId::new();
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            method = %request.method,
            path = %request.path
        );
        let _enter = span.enter();

        let mut trail = Trail::new(request_id);
        let start = Instant::now();
        let result = self.run(request_id, request, &mut trail);
        let latency_us = start.elapsed().as_micros();

        match result {
            Ok(body) => {
                trail.advance(DispatchState::Responded);
                info!(request_id = %request_id, latency_us = latency_us, status = 200, "Request dispatched");
                DispatchOutcome {
                    request_id,
                    state: DispatchState::Responded,
                    trail: trail.states,
                    response: HandlerResponse::json(200, body),
                    error: None,
                }
            }
            Err(err) => {
                let state = err.state();
                trail.advance(state);
                let status = err.status();
                if status >= 500 {
                    error!(request_id = %request_id, status = status, error = %err, latency_us = latency_us, "Dispatch failed");
                } else {
                    warn!(request_id = %request_id, status = status, error = %err, latency_us = latency_us, "Dispatch rejected");
                }
                DispatchOutcome {
                    request_id,
                    state,
                    trail: trail.states,
                    response: HandlerResponse::error(status, err.kind(), &err.to_string()),
                    error: Some(err),
                }
            }
        }
    }

    fn run(
        &self,
        request_id: RequestId,
        request: &DispatchRequest,
        trail: &mut Trail,
    ) -> Result<Value, DispatchError> {
        let matched = self
            .router
            .route(request.method.clone(), &request.path)
            .ok_or_else(|| DispatchError::NoMatch {
                method: request.method.to_string(),
                path: request.path.clone(),
            })?;
        trail.advance(DispatchState::Matched);

        let handler = self.handlers.get(&matched.handler_name).ok_or_else(|| {
            DispatchError::UnknownHandler {
                handler: matched.handler_name.clone(),
            }
        })?;

        let values = resolve_parameters(
            &matched.route.parameters,
            &matched.path_params,
            &request.query_params,
            &self.converters,
        )
        .map_err(DispatchError::Resolve)?;
        trail.advance(DispatchState::Resolved);

        let args = HandlerArgs {
            request_id,
            method: request.method.clone(),
            path: request.path.clone(),
            handler_name: matched.handler_name.clone(),
            route_name: matched.route.name.clone(),
            path_params: matched.path_params,
            query_params: request.query_params.clone(),
            values,
        };

        debug!(request_id = %request_id, handler_name = %args.handler_name, "Handler execution start");
        let invoked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(&args)));

        match invoked {
            Ok(Ok(body)) => {
                trail.advance(DispatchState::Invoked);
                Ok(body)
            }
            Ok(Err(err)) => match err.downcast::<ResolveError>() {
                // only typed request views may reject after resolution
                Ok(rejected @ ResolveError::Rejected { .. }) => {
                    Err(DispatchError::Resolve(rejected))
                }
                Ok(other) => Err(DispatchError::Handler {
                    handler: args.handler_name.clone(),
                    message: other.to_string(),
                }),
                Err(err) => Err(DispatchError::Handler {
                    handler: args.handler_name.clone(),
                    message: format!("{err:#}"),
                }),
            },
            Err(payload) => Err(DispatchError::HandlerPanic {
                handler: args.handler_name.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}
