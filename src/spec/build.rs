use super::types::{CompiledRoute, HandlerDescriptor, RouteDefinition, RouteTable};
use crate::router::{PathMatcher, PatternError};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Startup-time failure while building the route table or the dispatcher.
///
/// Every variant names the handler (and route, where relevant) at fault.
/// These errors are fatal: a process should not start serving with a
/// partially valid table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A route pattern or one of its requirements is malformed
    InvalidPattern {
        handler: String,
        pattern: String,
        reason: PatternError,
    },
    /// Two routes declare the same explicit name
    DuplicateRouteName {
        name: String,
        first_handler: String,
        second_handler: String,
    },
    /// Two handlers share an identifier
    DuplicateHandler { handler: String },
    /// A route file names a handler that was never registered
    UnknownHandler { handler: String },
    /// A route file lists a method that is not a valid HTTP token
    InvalidMethod { handler: String, method: String },
    /// A route points at a handler with no registered function
    MissingHandler { handler: String },
    /// A handler declares an entity parameter with no registered converter
    MissingConverter {
        handler: String,
        parameter: String,
        entity: String,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::InvalidPattern {
                handler,
                pattern,
                reason,
            } => write!(
                f,
                "invalid route pattern '{}' on handler '{}': {}",
                pattern, handler, reason
            ),
            ConfigurationError::DuplicateRouteName {
                name,
                first_handler,
                second_handler,
            } => write!(
                f,
                "route name '{}' is declared by both '{}' and '{}'",
                name, first_handler, second_handler
            ),
            ConfigurationError::DuplicateHandler { handler } => {
                write!(f, "handler '{}' is registered more than once", handler)
            }
            ConfigurationError::UnknownHandler { handler } => {
                write!(f, "route declared for unknown handler '{}'", handler)
            }
            ConfigurationError::InvalidMethod { handler, method } => {
                write!(f, "invalid HTTP method '{}' on handler '{}'", method, handler)
            }
            ConfigurationError::MissingHandler { handler } => {
                write!(f, "no handler function registered for '{}'", handler)
            }
            ConfigurationError::MissingConverter {
                handler,
                parameter,
                entity,
            } => write!(
                f,
                "parameter '{}' of handler '{}' needs a converter for entity '{}'",
                parameter, handler, entity
            ),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Build the route table from handler descriptors.
///
/// Routes are emitted in declaration order: handlers in the order given, and
/// each handler's routes in the order they were attached. Handlers with no
/// route metadata are skipped (not routable).
///
/// # Errors
///
/// Returns [`ConfigurationError`] on the first malformed pattern, invalid
/// requirement, duplicate route name or duplicate handler identifier.
pub fn extract_routes(handlers: &[HandlerDescriptor]) -> Result<RouteTable, ConfigurationError> {
    let mut seen_handlers = HashSet::with_capacity(handlers.len());
    let mut routes = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for handler in handlers {
        if !seen_handlers.insert(handler.id.as_str()) {
            return Err(ConfigurationError::DuplicateHandler {
                handler: handler.id.clone(),
            });
        }
        if handler.routes.is_empty() {
            debug!(handler_name = %handler.id, "Handler has no route metadata, not routable");
            continue;
        }

        let handler_name: Arc<str> = Arc::from(handler.id.as_str());
        let parameters: Arc<[_]> = Arc::from(handler.parameters.clone());

        for meta in &handler.routes {
            let matcher = PathMatcher::compile(&meta.pattern, &meta.requirements).map_err(
                |reason| ConfigurationError::InvalidPattern {
                    handler: handler.id.clone(),
                    pattern: meta.pattern.clone(),
                    reason,
                },
            )?;

            if let Some(name) = &meta.name {
                if let Some(&idx) = by_name.get(name) {
                    let first_handler = routes
                        .get(idx)
                        .map(|r: &CompiledRoute| r.definition.handler_name.to_string())
                        .unwrap_or_default();
                    return Err(ConfigurationError::DuplicateRouteName {
                        name: name.clone(),
                        first_handler,
                        second_handler: handler.id.clone(),
                    });
                }
                by_name.insert(name.clone(), routes.len());
            }

            let definition = RouteDefinition {
                pattern: meta.pattern.clone(),
                name: meta.name.clone(),
                requirements: meta.requirements.clone(),
                defaults: meta.defaults.clone(),
                methods: meta.methods.clone(),
                handler_name: Arc::clone(&handler_name),
                parameters: Arc::clone(&parameters),
                variables: matcher.variables().to_vec(),
            };
            debug!(
                handler_name = %handler.id,
                route_pattern = %definition.pattern,
                route_name = ?definition.name,
                methods = %definition.methods_label(),
                "Route extracted"
            );
            routes.push(CompiledRoute {
                definition: Arc::new(definition),
                matcher,
            });
        }
    }

    info!(
        handlers_count = handlers.len(),
        routes_count = routes.len(),
        named_routes = by_name.len(),
        "Route table extracted"
    );
    Ok(RouteTable::new(routes, by_name))
}
