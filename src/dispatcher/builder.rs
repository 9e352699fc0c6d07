use super::core::{Dispatcher, HandlerArgs, HandlerFn, HandlerRegistry};
use crate::resolver::{Converter, ConverterRegistry};
use crate::runtime_config::RuntimeConfig;
use crate::spec::{apply_route_file, extract_routes, load_route_file, ConfigurationError, HandlerDescriptor, RouteFile};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Collects handlers, converters and route files, then builds an immutable
/// [`Dispatcher`].
///
/// Handler order is declaration order: the first registered handler's routes
/// are tried first.
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    descriptors: Vec<HandlerDescriptor>,
    handlers: HandlerRegistry,
    converters: ConverterRegistry,
    route_files: Vec<RouteFile>,
    slow_match: Option<Duration>,
}

impl DispatcherBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler with its metadata and function.
    #[must_use]
    pub fn handler<F>(mut self, descriptor: HandlerDescriptor, handler: F) -> Self
    where
        F: Fn(&HandlerArgs) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let handler: HandlerFn = Arc::new(handler);
        self.handlers.insert(descriptor.id.as_str(), handler);
        debug!(handler_name = %descriptor.id, routes = descriptor.routes.len(), "Handler registered");
        self.descriptors.push(descriptor);
        self
    }

    /// Register the converter for an entity type.
    #[must_use]
    pub fn converter<C>(mut self, entity: &str, converter: C) -> Self
    where
        C: Converter + 'static,
    {
        self.converters.register(entity, Arc::new(converter));
        self
    }

    /// Attach external route declarations to the registered handlers.
    /// Applied at [`build`](Self::build) time, after every handler is known.
    #[must_use]
    pub fn route_file(mut self, file: RouteFile) -> Self {
        self.route_files.push(file);
        self
    }

    #[must_use]
    pub fn slow_match_threshold(mut self, threshold: Duration) -> Self {
        self.slow_match = Some(threshold);
        self
    }

    /// Apply runtime configuration, loading its route file if one is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured route file cannot be read or parsed.
    pub fn runtime_config(mut self, config: &RuntimeConfig) -> anyhow::Result<Self> {
        if let Some(path) = &config.routes_file {
            self.route_files.push(load_route_file(path)?);
        }
        self.slow_match = Some(config.slow_match);
        Ok(self)
    }

    /// Extract the route table and validate it against the registries.
    ///
    /// # Errors
    ///
    /// Any [`ConfigurationError`] from route file application, table
    /// extraction or [`Dispatcher::new`].
    pub fn build(self) -> Result<Dispatcher, ConfigurationError> {
        let DispatcherBuilder {
            mut descriptors,
            handlers,
            converters,
            route_files,
            slow_match,
        } = self;
        for file in &route_files {
            apply_route_file(&mut descriptors, file)?;
        }
        let table = extract_routes(&descriptors)?;
        let dispatcher = Dispatcher::new(Arc::new(table), Arc::new(converters), Arc::new(handlers))?;
        Ok(match slow_match {
            Some(threshold) => dispatcher.with_slow_match_threshold(threshold),
            None => dispatcher,
        })
    }
}
