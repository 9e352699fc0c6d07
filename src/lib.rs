//! # routebind
//!
//! **routebind** is a declarative request-routing core: handlers carry route
//! metadata, the metadata becomes an ordered route table, and each request is
//! matched, its path variables bound to the handler's declared parameters, and
//! the handler invoked. Domain entities are loaded by pluggable converters, so
//! a handler asks for a `Post` and receives the record, not an id.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Handler descriptors, route metadata, route files and
//!   extraction of the route table
//! - **[`router`]** - Pattern compilation, first-match request matching and
//!   reverse lookup (`url_for`)
//! - **[`resolver`]** - Parameter binding: primitive coercion and entity
//!   conversion through [`resolver::Converter`]s
//! - **[`dispatcher`]** - The per-request state machine tying the three
//!   together, with panic isolation and status mapping
//! - **[`typed`]** - Type-safe handler traits over the resolved arguments
//! - **[`otel`]** - Structured logging setup
//! - **[`runtime_config`]** - Environment-driven runtime settings
//! - **[`cli`]** - The `routebind` route inspection binary
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Dispatcher as dispatcher::Dispatcher
//!     participant Router as router::Router
//!     participant Resolver as resolver
//!     participant Converter
//!     participant Handler
//!
//!     Caller->>Dispatcher: dispatch(DispatchRequest)
//!     Dispatcher->>Router: route(method, path)
//!     Router-->>Dispatcher: RouteMatch (bindings)
//!     Dispatcher->>Resolver: resolve_parameters(params, bindings)
//!     Resolver->>Converter: convert(entity, id)
//!     Converter-->>Resolver: EntityRecord
//!     Resolver-->>Dispatcher: Vec<(name, BoundValue)>
//!     Dispatcher->>Handler: handler(&HandlerArgs)
//!     Handler-->>Dispatcher: JSON value
//!     Dispatcher-->>Caller: DispatchOutcome (Responded, 200)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use routebind::{DispatchRequest, DispatcherBuilder, HandlerDescriptor, ParamType, ParameterSpec, RouteMetadata};
//! use http::Method;
//!
//! let dispatcher = DispatcherBuilder::new()
//!     .handler(
//!         HandlerDescriptor::new("show_page")
//!             .route(RouteMetadata::new("/pages/{page}").name("page").requirement("page", r"\d+"))
//!             .param(ParameterSpec::primitive("page", ParamType::Int)),
//!         |args| Ok(serde_json::json!({ "page": args.int("page") })),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let outcome = dispatcher.dispatch(&DispatchRequest::new(Method::GET, "/pages/3"));
//! assert_eq!(outcome.response.body["page"], 3);
//!
//! let url = dispatcher.router().url_for_params("page", &[("page", "7")]).unwrap();
//! assert_eq!(url, "/pages/7");
//! ```
//!
//! ## Configuration
//!
//! | Variable | Purpose |
//! |----------|---------|
//! | `ROUTEBIND_ROUTES_FILE` | YAML/JSON route file |
//! | `ROUTEBIND_SLOW_MATCH_US` | slow-match warning threshold |
//! | `ROUTEBIND_LOG_LEVEL`, `ROUTEBIND_LOG_FORMAT`, `ROUTEBIND_LOG_LOCATION`, `ROUTEBIND_LOG_TARGETS` | logging |

pub mod cli;
pub mod dispatcher;
pub mod ids;
pub mod otel;
pub mod resolver;
pub mod router;
pub mod runtime_config;
pub mod spec;
pub mod typed;

pub use dispatcher::{
    DispatchOutcome, DispatchRequest, DispatchState, Dispatcher, DispatcherBuilder, HandlerArgs,
    HandlerResponse,
};
pub use resolver::{BoundValue, Converter, ConverterRegistry, EntityRecord};
pub use router::{RouteMatch, Router};
pub use spec::{
    extract_routes, load_route_file, ConfigurationError, HandlerDescriptor, ParamType,
    ParameterSpec, RouteMetadata, RouteTable,
};
