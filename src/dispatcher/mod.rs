//! # Dispatcher Module
//!
//! The dispatcher drives one request through the routing pipeline and turns
//! every outcome, good or bad, into a [`DispatchOutcome`].
//!
//! ## Request Flow
//!
//! 1. The [`Router`](crate::router::Router) matches method and path to a
//!    route, producing variable bindings
//! 2. The [resolver](crate::resolver) coerces primitives and loads entities
//!    through their converters
//! 3. The handler function registered under the route's handler name runs
//!    with the resolved [`HandlerArgs`]
//! 4. Its JSON result becomes a 200 response
//!
//! ## Error Handling
//!
//! | Failure | State | Status |
//! |---------|-------|--------|
//! | no route matches | `NotFound` | 404 |
//! | coercion failure, missing mapped variable, typed rejection | `BindingFailed` | 400 |
//! | converter returned nothing | `EntityMissing` | 404 |
//! | converter error, handler error, handler panic | `HandlerError` | 500 |
//!
//! Error bodies are `{"error": <kind>, "message": <reason>}`. Handler panics
//! are caught with `catch_unwind` and logged at error level.
//!
//! ## Building
//!
//! ```rust
//! use routebind::dispatcher::{DispatchRequest, DispatcherBuilder};
//! use routebind::resolver::EntityRecord;
//! use routebind::spec::{HandlerDescriptor, ParameterSpec, RouteMetadata};
//! use http::Method;
//!
//! let dispatcher = DispatcherBuilder::new()
//!     .converter("Post", |entity: &str, id: &str| -> anyhow::Result<Option<EntityRecord>> {
//!         Ok((id == "5").then(|| EntityRecord::new(entity, id, serde_json::json!({ "title": "Hello" }))))
//!     })
//!     .handler(
//!         HandlerDescriptor::new("show_post")
//!             .route(RouteMetadata::new("/posts/{id}").name("post_show").requirement("id", r"\d+"))
//!             .param(ParameterSpec::entity("post", "Post")),
//!         |args| Ok(args.entity("post").map(|p| p.data().clone()).unwrap_or_default()),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let outcome = dispatcher.dispatch(&DispatchRequest::new(Method::GET, "/posts/5"));
//! assert_eq!(outcome.response.status, 200);
//! assert_eq!(outcome.response.body["title"], "Hello");
//!
//! let missing = dispatcher.dispatch(&DispatchRequest::new(Method::GET, "/posts/6"));
//! assert_eq!(missing.response.status, 404);
//! ```
//!
//! ## Concurrency
//!
//! A built [`Dispatcher`] is immutable and `Send + Sync`; share it behind an
//! `Arc` or clone it. Converters and handlers must themselves be thread-safe.

mod builder;
mod core;

pub use builder::DispatcherBuilder;
pub use core::{
    DispatchError, DispatchOutcome, DispatchRequest, DispatchState, Dispatcher, HandlerArgs,
    HandlerFn, HandlerRegistry, HandlerResponse, HeaderVec, MAX_INLINE_HEADERS,
};
